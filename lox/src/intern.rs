use std::cell::RefCell;

use string_interner::{symbol::SymbolU32, DefaultBackend, DefaultHashBuilder};

/// Default string interner
pub type StringInterner<B = DefaultBackend<StrId>, H = DefaultHashBuilder> =
    string_interner::StringInterner<StrId, B, H>;

/// Interned string id
pub type StrId = SymbolU32;

thread_local! {
    static INTERN: RefCell<StringInterner> = RefCell::new(StringInterner::default());
}

/// Intern a string if it has not been allocated by the pool, otherwise return
/// the existing id for that string. The pool lives for the whole thread, so
/// ids stay valid across separate compilations and REPL lines.
pub fn id<S: AsRef<str>>(s: S) -> StrId {
    INTERN.with(|intern| intern.borrow_mut().get_or_intern(s))
}

/// Get an owned copy of the string behind an id.
pub fn str(id: StrId) -> String {
    INTERN.with(|intern| {
        intern
            .borrow()
            .resolve(id)
            .expect("String must be allocated prior to access.")
            .to_string()
    })
}
