// SPDX-License-Identifier: Apache-2.0 OR MIT
// Per-call request context appended to single-line messages

use std::cell::RefCell;

/// Key/value pairs describing the request being served, plus its id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub items: Vec<(String, String)>,
    pub request_id: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.items.push((key.into(), value.into()));
        self
    }

    pub fn with_request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }

    /// Render as `(KEY: value) ... (REQUEST-ID: id)`
    pub fn render(&self) -> String {
        let request_id = self
            .request_id
            .as_deref()
            .map(|id| ("REQUEST-ID", id));
        self.items
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(request_id)
            .map(|(k, v)| format!("({}: {})", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Source of the context for the call currently being logged
pub trait ContextProvider: Send + Sync {
    /// `None` when no request is being served
    fn current_context(&self) -> Option<RequestContext>;
}

/// Provider for processes that never serve requests
pub struct NoContext;

impl ContextProvider for NoContext {
    fn current_context(&self) -> Option<RequestContext> {
        None
    }
}

thread_local! {
    static CURRENT: RefCell<Option<RequestContext>> = const { RefCell::new(None) };
}

/// Provider reading the context installed by [`scope`] on the calling thread
pub struct ThreadContext;

impl ContextProvider for ThreadContext {
    fn current_context(&self) -> Option<RequestContext> {
        CURRENT.with(|current| current.borrow().clone())
    }
}

/// Run `f` with `context` installed for the calling thread
///
/// The previous context (if any) is restored afterwards, also on panic.
pub fn scope<R>(context: RequestContext, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<RequestContext>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            CURRENT.with(|current| *current.borrow_mut() = previous);
        }
    }

    let previous = CURRENT.with(|current| current.borrow_mut().replace(context));
    let _restore = Restore(previous);
    f()
}
