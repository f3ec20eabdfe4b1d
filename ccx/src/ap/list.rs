//! Terminator-Delimited Register Lists
//!
//! Register lists shared with awakening processors carry no length: the
//! first entry whose address is [`CPU_LIST_TERMINAL`] ends the list. A
//! [`RegisterList`] walks such a list without ever touching memory past the
//! terminator.

use core::marker::PhantomData;
use core::mem::size_of;
use core::ptr::NonNull;

/// Address value terminating register lists
pub const CPU_LIST_TERMINAL: u32 = 0xFFFF_FFFF;

/// An entry of a terminator-delimited register list.
pub trait ListEntry: Copy {
    /// Register address of the entry
    fn msr_addr(&self) -> u32;

    #[inline]
    fn is_terminal(&self) -> bool {
        self.msr_addr() == CPU_LIST_TERMINAL
    }
}

/// A terminator-delimited list owned by orchestration.
pub struct RegisterList<'a, T: ListEntry> {
    head: NonNull<T>,
    _list: PhantomData<&'a mut [T]>,
}

impl<'a, T: ListEntry> RegisterList<'a, T> {
    /// Wraps a list starting at `head`; `None` when `head` is null.
    ///
    /// # Safety
    /// `head` must point to a sequence of `T` that contains a terminator,
    /// valid for reads and writes for `'a`.
    pub unsafe fn from_raw(head: *mut T) -> Option<Self> {
        NonNull::new(head).map(|head| Self {
            head,
            _list: PhantomData,
        })
    }

    /// Wraps a slice. Panics if the slice holds no terminator.
    pub fn from_slice(list: &'a mut [T]) -> Self {
        assert!(
            list.iter().any(T::is_terminal),
            "register list without terminator"
        );
        Self {
            head: NonNull::from(list).cast(),
            _list: PhantomData,
        }
    }

    /// Address of the first entry
    pub fn as_ptr(&self) -> *mut T {
        self.head.as_ptr()
    }

    /// Pointers to every entry before the terminator
    pub(crate) fn walk(&self) -> impl Iterator<Item = *mut T> + '_ {
        let head = self.head.as_ptr();
        (0..)
            .map(move |i| head.wrapping_add(i))
            // SAFETY: `from_raw`/`from_slice` guarantee a terminator is
            // reached inside the allocation, and the walk stops there
            .take_while(|entry| unsafe { !entry.read().is_terminal() })
    }

    /// Copies of every entry before the terminator
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        // SAFETY: entries before the terminator are valid for reads
        self.walk().map(|entry| unsafe { entry.read() })
    }

    /// Number of entries before the terminator
    pub fn len(&self) -> usize {
        self.walk().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Size of the list in bytes, terminator included
    pub fn byte_size(&self) -> usize {
        (self.len() + 1) * size_of::<T>()
    }

    /// Visits each entry before the terminator
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        for entry in self.walk() {
            // SAFETY: entries are valid, and each is handed out exclusively
            f(unsafe { &mut *entry });
        }
    }

    /// The list as raw bytes, terminator included
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `byte_size` covers entries up to and including the
        // terminator, all valid for reads for 'a
        unsafe { core::slice::from_raw_parts(self.head.as_ptr().cast::<u8>(), self.byte_size()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(C)]
    struct Entry(u32);

    impl ListEntry for Entry {
        fn msr_addr(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_lengths() {
        let mut empty = [Entry(CPU_LIST_TERMINAL)];
        assert_eq!(RegisterList::from_slice(&mut empty).len(), 0);

        let mut one = [Entry(1), Entry(CPU_LIST_TERMINAL), Entry(9)];
        let list = RegisterList::from_slice(&mut one);
        assert_eq!(list.len(), 1);
        assert_eq!(list.byte_size(), 8);

        let mut many = [Entry(1), Entry(2), Entry(3), Entry(CPU_LIST_TERMINAL)];
        let list = RegisterList::from_slice(&mut many);
        assert_eq!(list.iter().map(|e| e.0).collect::<Vec<_>>(), [1, 2, 3]);
    }

    #[test]
    fn test_for_each_mut_skips_past_terminal() {
        let mut entries = [Entry(1), Entry(CPU_LIST_TERMINAL), Entry(7)];
        RegisterList::from_slice(&mut entries).for_each_mut(|e| e.0 += 10);
        assert_eq!(entries, [Entry(11), Entry(CPU_LIST_TERMINAL), Entry(7)]);
    }

    #[test]
    fn test_null_head_is_rejected() {
        // SAFETY: null is explicitly handled
        assert!(unsafe { RegisterList::<Entry>::from_raw(core::ptr::null_mut()) }.is_none());
    }

    #[test]
    #[should_panic(expected = "without terminator")]
    fn test_unterminated_slice_panics() {
        let mut entries = [Entry(1)];
        let _ = RegisterList::from_slice(&mut entries);
    }
}
