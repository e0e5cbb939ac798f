//! The page-automation seam.
//!
//! Every crawl component reads and pokes the page exclusively through
//! [`DomSurface`]: a narrow set of asynchronous DOM operations (element
//! counts, text/attribute reads, clicks, scrolls, bounded condition waits).
//! Selectors are opaque lookup keys supplied by configuration. The production
//! implementation drives a CDP page (`browser::CdpSurface`); tests substitute
//! a scripted mock.
//!
//! Read operations never abort a crawl round: a selector that matches nothing
//! reads as empty, and a failed query is indistinguishable from an empty one
//! at this boundary. Only interaction primitives (click, reload) report
//! automation failures upward.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CrawlError;

/// Asynchronous DOM operations against one live page.
///
/// Scoped variants (`scoped_*`) operate within the `index`-th element matched
/// by `scope`, never globally. Comment-thread assembly depends on this:
/// per-thread reads must not leak matches from sibling threads.
#[async_trait]
pub trait DomSurface: Send + Sync {
    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, CrawlError>;

    /// Whether at least one element matches `selector`.
    async fn exists(&self, selector: &str) -> Result<bool, CrawlError> {
        Ok(self.count(selector).await? > 0)
    }

    /// Inner text of every element matching `selector`, in document order.
    async fn texts(&self, selector: &str) -> Result<Vec<String>, CrawlError>;

    /// Value of `attr` for every element matching `selector`, in document
    /// order. Elements missing the attribute contribute an empty string so
    /// positions stay aligned with the match list.
    async fn attrs(&self, selector: &str, attr: &str) -> Result<Vec<String>, CrawlError>;

    /// Click the first element matching `selector`. Returns false when
    /// nothing matches.
    async fn click_first(&self, selector: &str) -> Result<bool, CrawlError>;

    /// Click the first element matching `selector` and type `text` into it.
    /// Returns false when nothing matches.
    async fn type_into(&self, selector: &str, text: &str) -> Result<bool, CrawlError>;

    /// Inner texts of `inner` matches within the `index`-th `scope` element.
    async fn scoped_texts(
        &self,
        scope: &str,
        index: usize,
        inner: &str,
    ) -> Result<Vec<String>, CrawlError>;

    /// Attribute values of `inner` matches within the `index`-th `scope`
    /// element. Missing attributes contribute empty strings.
    async fn scoped_attrs(
        &self,
        scope: &str,
        index: usize,
        inner: &str,
        attr: &str,
    ) -> Result<Vec<String>, CrawlError>;

    /// Click every `inner` match within the `index`-th `scope` element,
    /// best-effort. Returns how many clicks landed.
    async fn scoped_click_all(
        &self,
        scope: &str,
        index: usize,
        inner: &str,
    ) -> Result<usize, CrawlError>;

    /// Scroll the `index`-th element matching `selector` into view. Returns
    /// false when nothing matches.
    async fn scroll_into_view(&self, selector: &str, index: usize) -> Result<bool, CrawlError>;

    /// Scroll the window to the bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<(), CrawlError>;

    /// Wait until `selector` matches at least one element, up to `timeout`.
    /// Returns false on timeout; a timeout is a normal outcome here.
    async fn wait_for_present(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<bool, CrawlError>;

    /// Wait until `selector` matches strictly more than `above` elements, up
    /// to `timeout`. Returns false on timeout.
    async fn wait_for_count_above(
        &self,
        selector: &str,
        above: usize,
        timeout: Duration,
    ) -> Result<bool, CrawlError>;

    /// Reload the page and wait for it to settle.
    async fn reload(&self) -> Result<(), CrawlError>;

    /// Close the underlying page, releasing its tab and all associated
    /// browser state. Dropping the surface alone does not close the tab.
    async fn close(&self) -> Result<(), CrawlError>;
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted [`DomSurface`] for unit tests.

    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::DomSurface;
    use crate::error::CrawlError;

    /// A per-key response script: consumed front to back, repeating the last
    /// entry once exhausted.
    struct Script<T: Clone> {
        seq: VecDeque<T>,
        last: Option<T>,
    }

    impl<T: Clone> Script<T> {
        fn new() -> Self {
            Self {
                seq: VecDeque::new(),
                last: None,
            }
        }

        fn push(&mut self, value: T) {
            self.seq.push_back(value);
        }

        fn next(&mut self) -> Option<T> {
            if let Some(v) = self.seq.pop_front() {
                self.last = Some(v.clone());
                Some(v)
            } else {
                self.last.clone()
            }
        }
    }

    #[derive(Default)]
    struct ScriptMap<T: Clone> {
        inner: HashMap<String, Script<T>>,
    }

    impl<T: Clone> ScriptMap<T> {
        fn push(&mut self, key: &str, value: T) {
            self.inner
                .entry(key.to_string())
                .or_insert_with(Script::new)
                .push(value);
        }

        fn next(&mut self, key: &str) -> Option<T> {
            self.inner.get_mut(key).and_then(|s| s.next())
        }
    }

    /// Scripted surface. Responses are registered per selector (or per
    /// `scope#index inner` key for scoped reads) and replayed in order, with
    /// the last response repeating indefinitely. Unscripted reads are empty;
    /// unscripted waits time out. Interactions are recorded for assertions.
    pub struct MockSurface {
        counts: Mutex<ScriptMap<usize>>,
        texts: Mutex<ScriptMap<Vec<String>>>,
        attrs: Mutex<ScriptMap<Vec<String>>>,
        scoped_clicks: Mutex<ScriptMap<usize>>,
        waits: Mutex<ScriptMap<bool>>,
        pub clicked: Mutex<Vec<String>>,
        pub typed: Mutex<Vec<(String, String)>>,
        pub reloads: AtomicUsize,
        pub scrolls: AtomicUsize,
        pub closes: AtomicUsize,
    }

    impl MockSurface {
        pub fn new() -> Self {
            Self {
                counts: Mutex::new(ScriptMap::default()),
                texts: Mutex::new(ScriptMap::default()),
                attrs: Mutex::new(ScriptMap::default()),
                scoped_clicks: Mutex::new(ScriptMap::default()),
                waits: Mutex::new(ScriptMap::default()),
                clicked: Mutex::new(Vec::new()),
                typed: Mutex::new(Vec::new()),
                reloads: AtomicUsize::new(0),
                scrolls: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
            }
        }

        fn scoped_key(scope: &str, index: usize, inner: &str) -> String {
            format!("{scope}#{index} {inner}")
        }

        pub fn push_count(&self, selector: &str, count: usize) {
            self.counts.lock().unwrap().push(selector, count);
        }

        pub fn push_texts(&self, selector: &str, texts: &[&str]) {
            self.texts
                .lock()
                .unwrap()
                .push(selector, texts.iter().map(|s| s.to_string()).collect());
        }

        pub fn push_attrs(&self, selector: &str, values: &[&str]) {
            self.attrs
                .lock()
                .unwrap()
                .push(selector, values.iter().map(|s| s.to_string()).collect());
        }

        pub fn push_scoped_texts(&self, scope: &str, index: usize, inner: &str, texts: &[&str]) {
            self.texts.lock().unwrap().push(
                &Self::scoped_key(scope, index, inner),
                texts.iter().map(|s| s.to_string()).collect(),
            );
        }

        pub fn push_scoped_attrs(&self, scope: &str, index: usize, inner: &str, values: &[&str]) {
            self.attrs.lock().unwrap().push(
                &Self::scoped_key(scope, index, inner),
                values.iter().map(|s| s.to_string()).collect(),
            );
        }

        pub fn push_scoped_clicks(&self, scope: &str, index: usize, inner: &str, landed: usize) {
            self.scoped_clicks
                .lock()
                .unwrap()
                .push(&Self::scoped_key(scope, index, inner), landed);
        }

        pub fn push_wait(&self, selector: &str, outcome: bool) {
            self.waits.lock().unwrap().push(selector, outcome);
        }

        pub fn clicks_on(&self, selector: &str) -> usize {
            self.clicked
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.as_str() == selector)
                .count()
        }
    }

    #[async_trait]
    impl DomSurface for MockSurface {
        async fn count(&self, selector: &str) -> Result<usize, CrawlError> {
            Ok(self.counts.lock().unwrap().next(selector).unwrap_or(0))
        }

        async fn texts(&self, selector: &str) -> Result<Vec<String>, CrawlError> {
            Ok(self.texts.lock().unwrap().next(selector).unwrap_or_default())
        }

        async fn attrs(&self, selector: &str, _attr: &str) -> Result<Vec<String>, CrawlError> {
            Ok(self.attrs.lock().unwrap().next(selector).unwrap_or_default())
        }

        async fn click_first(&self, selector: &str) -> Result<bool, CrawlError> {
            self.clicked.lock().unwrap().push(selector.to_string());
            Ok(true)
        }

        async fn type_into(&self, selector: &str, text: &str) -> Result<bool, CrawlError> {
            self.typed
                .lock()
                .unwrap()
                .push((selector.to_string(), text.to_string()));
            Ok(true)
        }

        async fn scoped_texts(
            &self,
            scope: &str,
            index: usize,
            inner: &str,
        ) -> Result<Vec<String>, CrawlError> {
            let key = Self::scoped_key(scope, index, inner);
            Ok(self.texts.lock().unwrap().next(&key).unwrap_or_default())
        }

        async fn scoped_attrs(
            &self,
            scope: &str,
            index: usize,
            inner: &str,
            _attr: &str,
        ) -> Result<Vec<String>, CrawlError> {
            let key = Self::scoped_key(scope, index, inner);
            Ok(self.attrs.lock().unwrap().next(&key).unwrap_or_default())
        }

        async fn scoped_click_all(
            &self,
            scope: &str,
            index: usize,
            inner: &str,
        ) -> Result<usize, CrawlError> {
            let key = Self::scoped_key(scope, index, inner);
            Ok(self.scoped_clicks.lock().unwrap().next(&key).unwrap_or(0))
        }

        async fn scroll_into_view(&self, _selector: &str, _index: usize) -> Result<bool, CrawlError> {
            self.scrolls.fetch_add(1, Ordering::Relaxed);
            Ok(true)
        }

        async fn scroll_to_bottom(&self) -> Result<(), CrawlError> {
            self.scrolls.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn wait_for_present(
            &self,
            selector: &str,
            _timeout: Duration,
        ) -> Result<bool, CrawlError> {
            Ok(self.waits.lock().unwrap().next(selector).unwrap_or(false))
        }

        async fn wait_for_count_above(
            &self,
            selector: &str,
            _above: usize,
            _timeout: Duration,
        ) -> Result<bool, CrawlError> {
            Ok(self.waits.lock().unwrap().next(selector).unwrap_or(false))
        }

        async fn reload(&self) -> Result<(), CrawlError> {
            self.reloads.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn close(&self) -> Result<(), CrawlError> {
            self.closes.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }
}
