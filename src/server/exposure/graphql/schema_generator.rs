//! GraphQL SDL generator
//!
//! Renders the schema of every registered resolver: one object type per
//! entity, one input type per distinct input shape, and the `Query` and
//! `Mutation` roots listing exactly the generated operations.

use crate::core::descriptor::{FieldDescriptor, InputShape};
use crate::core::resolver::{CrudResolver, OperationKind, OperationSpec, ResolverRegistry, RootType};
use std::path::Path;

/// Schema generator that creates GraphQL SDL from the resolver registry
pub struct SchemaGenerator<'r> {
    registry: &'r ResolverRegistry,
}

impl<'r> SchemaGenerator<'r> {
    pub fn new(registry: &'r ResolverRegistry) -> Self {
        Self { registry }
    }

    /// Generate the complete SDL schema
    pub fn generate_sdl(&self) -> String {
        let mut sdl = String::from("scalar JSON\n\n");

        for resolver in self.registry.resolvers() {
            sdl.push_str(&Self::generate_entity_type(resolver));
            sdl.push_str("\n\n");
        }

        let mut seen: Vec<&str> = Vec::new();
        for resolver in self.registry.resolvers() {
            for shape in resolver.config().input_shapes() {
                if seen.contains(&shape.name()) {
                    continue;
                }
                seen.push(shape.name());
                sdl.push_str(&Self::generate_input_type(shape));
                sdl.push_str("\n\n");
            }
        }

        let query = self.generate_root(RootType::Query);
        let mutation = self.generate_root(RootType::Mutation);
        if let Some(query) = &query {
            sdl.push_str(query);
            sdl.push_str("\n\n");
        }
        if let Some(mutation) = &mutation {
            sdl.push_str(mutation);
            sdl.push_str("\n\n");
        }

        sdl.push_str("schema {\n");
        if query.is_some() {
            sdl.push_str("  query: Query\n");
        }
        if mutation.is_some() {
            sdl.push_str("  mutation: Mutation\n");
        }
        sdl.push_str("}\n");

        sdl
    }

    /// Write the SDL to a file, creating parent directories
    pub fn emit(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.generate_sdl())
    }

    fn generate_entity_type(resolver: &CrudResolver) -> String {
        let descriptor = resolver.config().descriptor();
        let mut type_def = String::new();
        if let Some(description) = descriptor.description() {
            type_def.push_str(&format!("\"\"\"{}\"\"\"\n", description));
        }
        type_def.push_str(&format!("type {} {{\n", descriptor.name()));
        type_def.push_str("  id: ID!\n");
        for field in descriptor.fields() {
            type_def.push_str(&Self::field_line(field));
        }
        type_def.push('}');
        type_def
    }

    fn generate_input_type(shape: &InputShape) -> String {
        let mut type_def = format!("input {} {{\n", shape.name());
        for field in shape.fields() {
            type_def.push_str(&Self::field_line(field));
        }
        type_def.push('}');
        type_def
    }

    fn field_line(field: &FieldDescriptor) -> String {
        let mut line = String::new();
        if let Some(description) = &field.description {
            line.push_str(&format!("  \"{}\"\n", description));
        }
        let bang = if field.nullable { "" } else { "!" };
        line.push_str(&format!(
            "  {}: {}{}\n",
            field.name,
            field.kind.graphql_type(),
            bang
        ));
        line
    }

    fn generate_root(&self, root: RootType) -> Option<String> {
        let mut fields = String::new();
        for resolver in self.registry.resolvers() {
            for op in resolver.config().operations() {
                if op.root == root {
                    fields.push_str(&Self::operation_field(resolver, op));
                }
            }
        }
        if fields.is_empty() {
            return None;
        }
        Some(format!("type {} {{\n{}}}", root, fields))
    }

    fn operation_field(resolver: &CrudResolver, op: &OperationSpec) -> String {
        let config = resolver.config();
        let entity = config.descriptor().name();
        let collection = config.descriptor().collection_name();
        let input = |kind| {
            config
                .input_for(kind)
                .map(|shape| shape.name().to_string())
                .unwrap_or_else(|| "JSON".to_string())
        };

        let (description, signature) = match op.kind {
            OperationKind::Find => (
                format!("Get a specific {} document from the {} collection.", entity, collection),
                format!("{}(id: ID!): {}", op.name, entity),
            ),
            OperationKind::List => (
                format!("Get a list of {} documents from the {} collection.", entity, collection),
                format!("{}(data: {}): [{}!]!", op.name, input(OperationKind::List), entity),
            ),
            OperationKind::Add => (
                format!("Add a new {} document to the {} collection.", entity, collection),
                format!("{}(data: {}!): {}", op.name, input(OperationKind::Add), entity),
            ),
            OperationKind::Edit => (
                format!("Update a {} document in the {} collection.", entity, collection),
                format!(
                    "{}(id: ID!, data: {}!): {}",
                    op.name,
                    input(OperationKind::Edit),
                    entity
                ),
            ),
            OperationKind::Delete => (
                format!("Delete a {} document in the {} collection.", entity, collection),
                format!("{}(id: ID!): {}", op.name, entity),
            ),
        };

        format!("  \"{}\"\n  {}\n", description, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor::{EntityDescriptor, FieldKind};
    use crate::core::resolver::{ResolverConfig, ResolverFactory};
    use crate::storage::InMemoryDocumentStore;
    use std::sync::Arc;

    fn registry(configs: Vec<ResolverConfig>) -> ResolverRegistry {
        let factory = ResolverFactory::new(Arc::new(InMemoryDocumentStore::new()));
        let mut registry = ResolverRegistry::new();
        for config in configs {
            registry
                .register(factory.create(config).expect("valid config"))
                .expect("unique names");
        }
        registry
    }

    fn widget() -> ResolverConfig {
        ResolverConfig::new(
            EntityDescriptor::new("Widget")
                .with_description("A thing on a shelf")
                .field(FieldDescriptor::required("name", FieldKind::String))
                .field(FieldDescriptor::optional("size", FieldKind::Int)),
        )
        .with_input(InputShape::new("WidgetInput").field(FieldDescriptor::required("name", FieldKind::String)))
    }

    #[test]
    fn test_sdl_lists_generated_operations() {
        let registry = registry(vec![widget()]);
        let sdl = SchemaGenerator::new(&registry).generate_sdl();

        assert!(sdl.contains("\"\"\"A thing on a shelf\"\"\"\ntype Widget {\n  id: ID!\n  name: String!\n  size: Int\n}"));
        assert!(sdl.contains("input WidgetInput {\n  name: String!\n}"));
        assert!(sdl.contains("input ListQueryInput {"));
        assert!(sdl.contains("  widget(id: ID!): Widget\n"));
        assert!(sdl.contains("  widgets(data: ListQueryInput): [Widget!]!\n"));
        assert!(sdl.contains("  addWidget(data: WidgetInput!): Widget\n"));
        assert!(sdl.contains("  editWidget(id: ID!, data: WidgetInput!): Widget\n"));
        assert!(sdl.contains("  deleteWidget(id: ID!): Widget\n"));
        assert!(sdl.contains("  mutation: Mutation\n"));
        // The edit input defaults to the create input; it is emitted once
        assert_eq!(sdl.matches("input WidgetInput").count(), 1);
    }

    #[test]
    fn test_read_only_schema_has_no_mutation_root() {
        let registry = registry(vec![ResolverConfig::new(EntityDescriptor::new("Category"))]);
        let sdl = SchemaGenerator::new(&registry).generate_sdl();

        assert!(sdl.contains("  categories(data: ListQueryInput): [Category!]!\n"));
        assert!(!sdl.contains("type Mutation"));
        assert!(!sdl.contains("mutation: Mutation"));
    }

    #[test]
    fn test_shared_list_input_emitted_once() {
        let registry = registry(vec![
            widget(),
            ResolverConfig::new(EntityDescriptor::new("Category")),
        ]);
        let sdl = SchemaGenerator::new(&registry).generate_sdl();
        assert_eq!(sdl.matches("input ListQueryInput").count(), 1);
    }

    #[test]
    fn test_emit_writes_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("schema.graphql");
        let registry = registry(vec![widget()]);

        SchemaGenerator::new(&registry).emit(&path).expect("write schema");

        let written = std::fs::read_to_string(&path).expect("read schema");
        assert!(written.contains("type Query"));
    }
}
