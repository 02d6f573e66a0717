//! The generic CRUD-resolver factory
//!
//! A [`ResolverConfig`] describes one entity: its descriptor, the input
//! shapes it accepts, optional name overrides, lifecycle hooks and the roles
//! allowed to call each operation. [`ResolverConfig::resolve`] turns it into
//! an immutable [`ResolvedConfig`] once at startup, with every default
//! substituted and the [`ResolverShape`] fixed. A [`ResolverFactory`] then
//! binds resolved configurations to a store, producing one [`CrudResolver`]
//! per entity.

use crate::core::descriptor::{EntityDescriptor, InputShape};
use crate::core::document::{Document, Fields, fields_from_value};
use crate::core::error::{ConfigError, DocGraphError, DocumentError, Result, ValidationError};
use crate::core::facade::Collection;
use crate::core::hooks::{HookContext, HookOutcome, Hooks, ResolvedHooks};
use crate::core::naming::{cap_first, is_valid_graphql_name, uncap_first};
use crate::core::query::ListInput;
use crate::core::store::DocumentStore;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// The five operations a resolver can generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Find,
    List,
    Add,
    Edit,
    Delete,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Find,
        OperationKind::List,
        OperationKind::Add,
        OperationKind::Edit,
        OperationKind::Delete,
    ];

    /// Root type the operation is exposed on
    pub fn root(&self) -> RootType {
        match self {
            OperationKind::Find | OperationKind::List => RootType::Query,
            OperationKind::Add | OperationKind::Edit | OperationKind::Delete => RootType::Mutation,
        }
    }
}

/// GraphQL root operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootType {
    Query,
    Mutation,
}

impl fmt::Display for RootType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootType::Query => write!(f, "Query"),
            RootType::Mutation => write!(f, "Mutation"),
        }
    }
}

/// The closed set of resolver layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverShape {
    /// Lookup only; the list query is supplied elsewhere
    FindOnly,
    /// Lookup and list
    ReadOnly,
    /// Lookup and the three mutations; the list query is supplied elsewhere
    CrudCustomList,
    /// All five operations
    Crud,
}

impl ResolverShape {
    fn from_flags(has_create_input: bool, custom_list_query: bool) -> Self {
        match (has_create_input, custom_list_query) {
            (false, true) => ResolverShape::FindOnly,
            (false, false) => ResolverShape::ReadOnly,
            (true, true) => ResolverShape::CrudCustomList,
            (true, false) => ResolverShape::Crud,
        }
    }

    /// Operations generated for this shape, in schema order
    pub fn operations(&self) -> &'static [OperationKind] {
        use OperationKind::*;
        match self {
            ResolverShape::FindOnly => &[Find],
            ResolverShape::ReadOnly => &[Find, List],
            ResolverShape::CrudCustomList => &[Find, Add, Edit, Delete],
            ResolverShape::Crud => &[Find, List, Add, Edit, Delete],
        }
    }
}

/// One generated operation
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSpec {
    pub name: String,
    pub kind: OperationKind,
    pub root: RootType,
    /// Roles allowed to call the operation; `None` means no auth check
    pub roles: Option<Vec<String>>,
}

/// Result of a mutation: either done, or vetoed by a before-hook
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Done(T),
    Vetoed,
}

impl<T> Outcome<T> {
    pub fn is_vetoed(&self) -> bool {
        matches!(self, Outcome::Vetoed)
    }

    /// The value, or `None` when vetoed
    pub fn done(self) -> Option<T> {
        match self {
            Outcome::Done(value) => Some(value),
            Outcome::Vetoed => None,
        }
    }
}

/// Settings for one entity's resolver
///
/// ```rust,ignore
/// let config = ResolverConfig::new(widget_descriptor())
///     .with_input(InputShape::new("WidgetInput").field(FieldDescriptor::required("name", FieldKind::String)))
///     .with_hooks(Hooks::new().on_after_find(|doc, _| async move { Ok(doc) }))
///     .authorize(OperationKind::Delete, ["admin"]);
/// ```
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    descriptor: EntityDescriptor,
    create_input: Option<InputShape>,
    edit_input: Option<InputShape>,
    list_input: Option<InputShape>,
    custom_list_query: bool,
    names: HashMap<OperationKind, String>,
    hooks: Hooks,
    roles: HashMap<OperationKind, Vec<String>>,
}

impl ResolverConfig {
    pub fn new(descriptor: EntityDescriptor) -> Self {
        Self {
            descriptor,
            create_input: None,
            edit_input: None,
            list_input: None,
            custom_list_query: false,
            names: HashMap::new(),
            hooks: Hooks::new(),
            roles: HashMap::new(),
        }
    }

    /// Input accepted by the create mutation; enables add/edit/delete
    pub fn with_input(mut self, shape: InputShape) -> Self {
        self.create_input = Some(shape);
        self
    }

    /// Distinct input for the edit mutation (defaults to the create input)
    pub fn with_edit_input(mut self, shape: InputShape) -> Self {
        self.edit_input = Some(shape);
        self
    }

    /// Filter input of the list query (defaults to `ListQueryInput`)
    ///
    /// Fields other than `limit` reach `on_before_list` through
    /// [`ListInput::extra`].
    pub fn with_list_input(mut self, shape: InputShape) -> Self {
        self.list_input = Some(shape);
        self
    }

    /// Do not generate the list query; the application provides its own
    pub fn with_custom_list_query(mut self) -> Self {
        self.custom_list_query = true;
        self
    }

    /// Override the exposed name of one operation
    pub fn with_name(mut self, kind: OperationKind, name: impl Into<String>) -> Self {
        self.names.insert(kind, name.into());
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Require an auth check for an operation
    ///
    /// An empty role list still requires a verified caller.
    pub fn authorize<I, S>(mut self, kind: OperationKind, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .insert(kind, roles.into_iter().map(Into::into).collect());
        self
    }

    /// Require an auth check for every generated operation
    pub fn authorize_all<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roles: Vec<String> = roles.into_iter().map(Into::into).collect();
        for kind in OperationKind::ALL {
            self.roles.insert(kind, roles.clone());
        }
        self
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    fn default_name(&self, kind: OperationKind) -> String {
        let entity = cap_first(self.descriptor.name());
        match kind {
            OperationKind::Find => uncap_first(self.descriptor.name()),
            OperationKind::List => uncap_first(self.descriptor.collection_name()),
            OperationKind::Add => format!("add{}", entity),
            OperationKind::Edit => format!("edit{}", entity),
            OperationKind::Delete => format!("delete{}", entity),
        }
    }

    /// Substitute every default and fix the operation set
    pub fn resolve(self) -> std::result::Result<ResolvedConfig, ConfigError> {
        if !is_valid_graphql_name(self.descriptor.name()) {
            return Err(ConfigError::InvalidName {
                name: self.descriptor.name().to_string(),
            });
        }

        let shape = ResolverShape::from_flags(self.create_input.is_some(), self.custom_list_query);

        let mut seen = HashSet::new();
        let mut operations = Vec::new();
        for &kind in shape.operations() {
            let name = self
                .names
                .get(&kind)
                .cloned()
                .unwrap_or_else(|| self.default_name(kind));
            if !is_valid_graphql_name(&name) {
                return Err(ConfigError::InvalidName { name });
            }
            if !seen.insert(name.clone()) {
                return Err(ConfigError::DuplicateName { name });
            }
            operations.push(OperationSpec {
                name,
                kind,
                root: kind.root(),
                roles: self.roles.get(&kind).cloned(),
            });
        }

        let edit_input = match (&self.edit_input, &self.create_input) {
            (Some(edit), _) => Some(edit.clone()),
            (None, Some(create)) => Some(create.clone()),
            (None, None) => None,
        };
        let list_input = (!self.custom_list_query)
            .then(|| self.list_input.clone().unwrap_or_else(InputShape::list_query));

        tracing::debug!(
            entity = self.descriptor.name(),
            shape = ?shape,
            hooks = ?self.hooks.registered(),
            "resolved resolver configuration"
        );

        Ok(ResolvedConfig {
            descriptor: self.descriptor,
            shape,
            operations,
            create_input: self.create_input,
            edit_input,
            list_input,
            hooks: self.hooks.resolve(),
        })
    }
}

/// A fully resolved, immutable resolver configuration
pub struct ResolvedConfig {
    descriptor: EntityDescriptor,
    shape: ResolverShape,
    operations: Vec<OperationSpec>,
    create_input: Option<InputShape>,
    edit_input: Option<InputShape>,
    list_input: Option<InputShape>,
    hooks: ResolvedHooks,
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("entity", &self.descriptor.name())
            .field("shape", &self.shape)
            .field("operations", &self.operations)
            .finish()
    }
}

impl ResolvedConfig {
    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    pub fn shape(&self) -> ResolverShape {
        self.shape
    }

    /// Generated operations, in schema order
    pub fn operations(&self) -> &[OperationSpec] {
        &self.operations
    }

    pub fn operation(&self, kind: OperationKind) -> Option<&OperationSpec> {
        self.operations.iter().find(|op| op.kind == kind)
    }

    /// Input shape an operation's payload is validated against
    pub fn input_for(&self, kind: OperationKind) -> Option<&InputShape> {
        match kind {
            OperationKind::Add => self.create_input.as_ref(),
            OperationKind::Edit => self.edit_input.as_ref(),
            OperationKind::List => self.list_input.as_ref(),
            OperationKind::Find | OperationKind::Delete => None,
        }
    }

    /// Distinct input shapes referenced by the generated operations
    pub fn input_shapes(&self) -> Vec<&InputShape> {
        let mut shapes: Vec<&InputShape> = Vec::new();
        for op in &self.operations {
            if let Some(shape) = self.input_for(op.kind) {
                if !shapes.iter().any(|s| s.name() == shape.name()) {
                    shapes.push(shape);
                }
            }
        }
        shapes
    }
}

/// Binds resolved configurations to a store
#[derive(Clone)]
pub struct ResolverFactory {
    store: Arc<dyn DocumentStore>,
}

impl ResolverFactory {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Resolve a configuration and bind it to the store
    pub fn create(&self, config: ResolverConfig) -> Result<CrudResolver> {
        Ok(self.bind(config.resolve()?))
    }

    pub fn bind(&self, config: ResolvedConfig) -> CrudResolver {
        let collection = Collection::new(
            self.store.clone(),
            config.descriptor.collection_name().to_string(),
        );
        CrudResolver {
            config: Arc::new(config),
            collection,
        }
    }
}

/// The operation handlers of one entity
#[derive(Clone)]
pub struct CrudResolver {
    config: Arc<ResolvedConfig>,
    collection: Collection,
}

impl fmt::Debug for CrudResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudResolver")
            .field("config", &self.config)
            .field("collection", &self.collection)
            .finish()
    }
}

impl CrudResolver {
    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Facade over this entity's collection
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Look a document up by id; `None` when it does not exist
    pub async fn find(&self, id: &str, ctx: &HookContext) -> Result<Option<Document>> {
        let hooks = &self.config.hooks;
        let doc = match hooks.before_find(id, ctx).await {
            Some(replaced) => replaced?,
            None => self.collection.find(id).await?,
        };
        hooks.after_find(doc, ctx).await
    }

    /// List documents, at most `input.limit()` when the store is queried
    pub async fn list(&self, input: ListInput, ctx: &HookContext) -> Result<Vec<Document>> {
        let hooks = &self.config.hooks;
        let docs = match hooks.before_list(&input, ctx).await {
            Some(replaced) => replaced?,
            None => self.collection.list(Some(input.limit())).await?,
        };
        hooks.after_list(docs, ctx).await
    }

    /// Create a document unless a before-hook vetoes it
    pub async fn add(&self, data: Fields, ctx: &HookContext) -> Result<Outcome<Document>> {
        let hooks = &self.config.hooks;
        let data = match hooks.before_add(data, ctx).await? {
            HookOutcome::Continue(data) => data,
            HookOutcome::Veto => {
                tracing::debug!(entity = self.config.descriptor.name(), "add vetoed by hook");
                return Ok(Outcome::Vetoed);
            }
        };
        let doc = self.collection.create(data).await?;
        Ok(Outcome::Done(hooks.after_add(doc, ctx).await?))
    }

    /// Merge into a document unless a before-hook vetoes it
    pub async fn edit(&self, id: &str, data: Fields, ctx: &HookContext) -> Result<Outcome<Document>> {
        let hooks = &self.config.hooks;
        let data = match hooks.before_edit(data, ctx).await? {
            HookOutcome::Continue(data) => data,
            HookOutcome::Veto => {
                tracing::debug!(entity = self.config.descriptor.name(), id, "edit vetoed by hook");
                return Ok(Outcome::Vetoed);
            }
        };
        let doc = self.collection.update(id, data).await?;
        Ok(Outcome::Done(hooks.after_edit(doc, ctx).await?))
    }

    /// Delete a document and return its last state
    ///
    /// Fails with `NotFound` before any hook runs when the id is unknown.
    pub async fn delete(&self, id: &str, ctx: &HookContext) -> Result<Outcome<Document>> {
        let hooks = &self.config.hooks;
        let snapshot = self
            .collection
            .find(id)
            .await?
            .ok_or_else(|| DocGraphError::not_found(self.collection.name(), id))?;

        if let HookOutcome::Veto = hooks.before_delete(snapshot.clone(), ctx).await? {
            tracing::debug!(entity = self.config.descriptor.name(), id, "delete vetoed by hook");
            return Ok(Outcome::Vetoed);
        }

        self.collection.remove(id).await?;
        Ok(Outcome::Done(hooks.after_delete(snapshot, ctx).await?))
    }

    /// Run an operation from raw GraphQL arguments
    ///
    /// Payloads are validated against the operation's input shape first.
    /// Documents are returned as JSON objects including `id`; a vetoed
    /// mutation yields `false`.
    pub async fn dispatch(
        &self,
        kind: OperationKind,
        args: &Map<String, Value>,
        ctx: &HookContext,
    ) -> Result<Value> {
        match kind {
            OperationKind::Find => {
                let id = id_arg(args)?;
                Ok(option_to_json(self.find(&id, ctx).await?))
            }
            OperationKind::List => {
                let raw = args
                    .get("data")
                    .filter(|v| !v.is_null())
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                if let Some(shape) = self.config.input_for(kind) {
                    shape.validate(&raw)?;
                }
                let input: ListInput = serde_json::from_value(raw)?;
                let docs = self.list(input, ctx).await?;
                Ok(Value::Array(docs.iter().map(Document::to_json).collect()))
            }
            OperationKind::Add => {
                let data = self.payload(kind, args)?;
                Ok(outcome_to_json(self.add(data, ctx).await?))
            }
            OperationKind::Edit => {
                let id = id_arg(args)?;
                let data = self.payload(kind, args)?;
                Ok(outcome_to_json(self.edit(&id, data, ctx).await?))
            }
            OperationKind::Delete => {
                let id = id_arg(args)?;
                Ok(outcome_to_json(self.delete(&id, ctx).await?))
            }
        }
    }

    fn payload(&self, kind: OperationKind, args: &Map<String, Value>) -> Result<Fields> {
        let raw = args
            .get("data")
            .cloned()
            .ok_or_else(|| ValidationError::MissingArgument {
                argument: "data".to_string(),
            })?;
        if let Some(shape) = self.config.input_for(kind) {
            shape.validate(&raw)?;
        }
        fields_from_value(raw).ok_or_else(|| {
            ValidationError::NotAnObject {
                shape: "data".to_string(),
            }
            .into()
        })
    }
}

fn id_arg(args: &Map<String, Value>) -> Result<String> {
    match args.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ValidationError::MissingArgument {
            argument: "id".to_string(),
        }
        .into()),
    }
}

fn option_to_json(doc: Option<Document>) -> Value {
    doc.map(|d| d.to_json()).unwrap_or(Value::Null)
}

fn outcome_to_json(outcome: Outcome<Document>) -> Value {
    match outcome {
        Outcome::Done(doc) => doc.to_json(),
        Outcome::Vetoed => Value::Bool(false),
    }
}

/// Registry of resolvers indexed by operation name
#[derive(Debug, Clone, Default)]
pub struct ResolverRegistry {
    resolvers: Vec<CrudResolver>,
    by_name: HashMap<String, (usize, OperationKind)>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resolver; operation names must be unique across entities
    pub fn register(&mut self, resolver: CrudResolver) -> std::result::Result<(), ConfigError> {
        for op in resolver.config().operations() {
            if self.by_name.contains_key(&op.name) {
                return Err(ConfigError::DuplicateName {
                    name: op.name.clone(),
                });
            }
        }
        let index = self.resolvers.len();
        for op in resolver.config().operations() {
            self.by_name.insert(op.name.clone(), (index, op.kind));
        }
        self.resolvers.push(resolver);
        Ok(())
    }

    /// Resolver and operation registered under a root field name
    pub fn lookup(&self, name: &str) -> Result<(&CrudResolver, &OperationSpec)> {
        let unknown = || DocumentError::UnknownOperation {
            name: name.to_string(),
        };
        let (index, kind) = self.by_name.get(name).ok_or_else(unknown)?;
        let resolver = &self.resolvers[*index];
        let spec = resolver.config().operation(*kind).ok_or_else(unknown)?;
        Ok((resolver, spec))
    }

    /// Registered resolvers, in registration order
    pub fn resolvers(&self) -> &[CrudResolver] {
        &self.resolvers
    }

    /// Resolver for an entity type name
    pub fn by_entity(&self, entity: &str) -> Option<&CrudResolver> {
        self.resolvers
            .iter()
            .find(|r| r.config().descriptor().name() == entity)
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}
