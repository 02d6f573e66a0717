//! Lifecycle hooks around the generated operations
//!
//! Every hook is optional. Before-hooks on `find` and `list` replace the
//! default store lookup; before-hooks on writes and deletes may rewrite the
//! payload or veto the operation. The write hooks (`on_before_write`,
//! `on_after_write`) are the fallback for both add and edit.

use crate::core::document::{Document, Fields};
use crate::core::error::Result;
use crate::core::query::ListInput;
use futures::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// Which surface triggered an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interface {
    GraphQL,
}

/// Context handed to every hook invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    pub interface: Interface,
}

impl HookContext {
    /// Context for calls arriving through the GraphQL API
    pub fn graphql() -> Self {
        Self {
            interface: Interface::GraphQL,
        }
    }
}

impl Default for HookContext {
    fn default() -> Self {
        Self::graphql()
    }
}

/// Decision of a before-hook on a write or delete
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome<T> {
    /// Proceed with this (possibly rewritten) payload
    Continue(T),
    /// Abort the operation without touching the store
    Veto,
}

/// A type-erased async hook
pub type HookFn<I, O> = Arc<dyn Fn(I, HookContext) -> BoxFuture<'static, Result<O>> + Send + Sync>;

fn erase<I, O, F, Fut>(hook: F) -> HookFn<I, O>
where
    F: Fn(I, HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    Arc::new(move |input, ctx| Box::pin(hook(input, ctx)))
}

/// The twelve optional lifecycle hooks of one entity
///
/// ```rust,ignore
/// let hooks = Hooks::new()
///     .on_before_write(|mut data, _ctx| async move {
///         data.insert("slug".into(), json!("generated"));
///         Ok(HookOutcome::Continue(data))
///     })
///     .on_before_delete(|doc, _ctx| async move {
///         Ok(if doc.fields["locked"] == true { HookOutcome::Veto } else { HookOutcome::Continue(()) })
///     });
/// ```
#[derive(Clone, Default)]
pub struct Hooks {
    before_find: Option<HookFn<String, Option<Document>>>,
    after_find: Option<HookFn<Option<Document>, Option<Document>>>,
    before_list: Option<HookFn<ListInput, Vec<Document>>>,
    after_list: Option<HookFn<Vec<Document>, Vec<Document>>>,
    before_add: Option<HookFn<Fields, HookOutcome<Fields>>>,
    after_add: Option<HookFn<Document, Document>>,
    before_edit: Option<HookFn<Fields, HookOutcome<Fields>>>,
    after_edit: Option<HookFn<Document, Document>>,
    before_delete: Option<HookFn<Document, HookOutcome<()>>>,
    after_delete: Option<HookFn<Document, Document>>,
    before_write: Option<HookFn<Fields, HookOutcome<Fields>>>,
    after_write: Option<HookFn<Document, Document>>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("registered", &self.registered())
            .finish()
    }
}

macro_rules! hook_setter {
    ($(#[$doc:meta])* $setter:ident, $field:ident, $input:ty, $output:ty) => {
        $(#[$doc])*
        pub fn $setter<F, Fut>(mut self, hook: F) -> Self
        where
            F: Fn($input, HookContext) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<$output>> + Send + 'static,
        {
            self.$field = Some(erase(hook));
            self
        }
    };
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    hook_setter!(
        /// Replaces the store lookup of `find`
        on_before_find, before_find, String, Option<Document>
    );
    hook_setter!(on_after_find, after_find, Option<Document>, Option<Document>);
    hook_setter!(
        /// Replaces the store query of `list`
        on_before_list, before_list, ListInput, Vec<Document>
    );
    hook_setter!(on_after_list, after_list, Vec<Document>, Vec<Document>);
    hook_setter!(on_before_add, before_add, Fields, HookOutcome<Fields>);
    hook_setter!(on_after_add, after_add, Document, Document);
    hook_setter!(on_before_edit, before_edit, Fields, HookOutcome<Fields>);
    hook_setter!(on_after_edit, after_edit, Document, Document);
    hook_setter!(
        /// Receives the pre-deletion snapshot; may veto the delete
        on_before_delete, before_delete, Document, HookOutcome<()>
    );
    hook_setter!(on_after_delete, after_delete, Document, Document);
    hook_setter!(
        /// Fallback for `on_before_add` and `on_before_edit`
        on_before_write, before_write, Fields, HookOutcome<Fields>
    );
    hook_setter!(
        /// Fallback for `on_after_add` and `on_after_edit`
        on_after_write, after_write, Document, Document
    );

    /// Names of the hooks that are set
    pub fn registered(&self) -> Vec<&'static str> {
        let slots = [
            ("on_before_find", self.before_find.is_some()),
            ("on_after_find", self.after_find.is_some()),
            ("on_before_list", self.before_list.is_some()),
            ("on_after_list", self.after_list.is_some()),
            ("on_before_add", self.before_add.is_some()),
            ("on_after_add", self.after_add.is_some()),
            ("on_before_edit", self.before_edit.is_some()),
            ("on_after_edit", self.after_edit.is_some()),
            ("on_before_delete", self.before_delete.is_some()),
            ("on_after_delete", self.after_delete.is_some()),
            ("on_before_write", self.before_write.is_some()),
            ("on_after_write", self.after_write.is_some()),
        ];
        slots
            .into_iter()
            .filter(|(_, set)| *set)
            .map(|(name, _)| name)
            .collect()
    }

    /// Fold the write fallbacks into the per-operation slots
    pub(crate) fn resolve(self) -> ResolvedHooks {
        ResolvedHooks {
            before_find: self.before_find,
            after_find: self.after_find,
            before_list: self.before_list,
            after_list: self.after_list,
            before_add: self.before_add.or_else(|| self.before_write.clone()),
            after_add: self.after_add.or_else(|| self.after_write.clone()),
            before_edit: self.before_edit.or(self.before_write),
            after_edit: self.after_edit.or(self.after_write),
            before_delete: self.before_delete,
            after_delete: self.after_delete,
        }
    }
}

/// Hooks with the add/edit fallbacks already substituted
#[derive(Clone, Default)]
pub(crate) struct ResolvedHooks {
    before_find: Option<HookFn<String, Option<Document>>>,
    after_find: Option<HookFn<Option<Document>, Option<Document>>>,
    before_list: Option<HookFn<ListInput, Vec<Document>>>,
    after_list: Option<HookFn<Vec<Document>, Vec<Document>>>,
    before_add: Option<HookFn<Fields, HookOutcome<Fields>>>,
    after_add: Option<HookFn<Document, Document>>,
    before_edit: Option<HookFn<Fields, HookOutcome<Fields>>>,
    after_edit: Option<HookFn<Document, Document>>,
    before_delete: Option<HookFn<Document, HookOutcome<()>>>,
    after_delete: Option<HookFn<Document, Document>>,
}

async fn run<I, O>(hook: &HookFn<I, O>, input: I, ctx: &HookContext) -> Result<O> {
    hook(input, ctx.clone()).await
}

impl ResolvedHooks {
    /// `Some(result)` when a before-find hook replaced the lookup
    pub(crate) async fn before_find(
        &self,
        id: &str,
        ctx: &HookContext,
    ) -> Option<Result<Option<Document>>> {
        match &self.before_find {
            Some(hook) => Some(run(hook, id.to_string(), ctx).await),
            None => None,
        }
    }

    pub(crate) async fn after_find(
        &self,
        doc: Option<Document>,
        ctx: &HookContext,
    ) -> Result<Option<Document>> {
        match &self.after_find {
            Some(hook) => run(hook, doc, ctx).await,
            None => Ok(doc),
        }
    }

    /// `Some(result)` when a before-list hook replaced the query
    pub(crate) async fn before_list(
        &self,
        input: &ListInput,
        ctx: &HookContext,
    ) -> Option<Result<Vec<Document>>> {
        match &self.before_list {
            Some(hook) => Some(run(hook, input.clone(), ctx).await),
            None => None,
        }
    }

    pub(crate) async fn after_list(
        &self,
        docs: Vec<Document>,
        ctx: &HookContext,
    ) -> Result<Vec<Document>> {
        match &self.after_list {
            Some(hook) => run(hook, docs, ctx).await,
            None => Ok(docs),
        }
    }

    pub(crate) async fn before_add(
        &self,
        data: Fields,
        ctx: &HookContext,
    ) -> Result<HookOutcome<Fields>> {
        match &self.before_add {
            Some(hook) => run(hook, data, ctx).await,
            None => Ok(HookOutcome::Continue(data)),
        }
    }

    pub(crate) async fn after_add(&self, doc: Document, ctx: &HookContext) -> Result<Document> {
        match &self.after_add {
            Some(hook) => run(hook, doc, ctx).await,
            None => Ok(doc),
        }
    }

    pub(crate) async fn before_edit(
        &self,
        data: Fields,
        ctx: &HookContext,
    ) -> Result<HookOutcome<Fields>> {
        match &self.before_edit {
            Some(hook) => run(hook, data, ctx).await,
            None => Ok(HookOutcome::Continue(data)),
        }
    }

    pub(crate) async fn after_edit(&self, doc: Document, ctx: &HookContext) -> Result<Document> {
        match &self.after_edit {
            Some(hook) => run(hook, doc, ctx).await,
            None => Ok(doc),
        }
    }

    pub(crate) async fn before_delete(
        &self,
        snapshot: Document,
        ctx: &HookContext,
    ) -> Result<HookOutcome<()>> {
        match &self.before_delete {
            Some(hook) => run(hook, snapshot, ctx).await,
            None => Ok(HookOutcome::Continue(())),
        }
    }

    pub(crate) async fn after_delete(&self, snapshot: Document, ctx: &HookContext) -> Result<Document> {
        match &self.after_delete {
            Some(hook) => run(hook, snapshot, ctx).await,
            None => Ok(snapshot),
        }
    }
}
