//! Utility functions for GraphQL execution

use crate::core::error::GraphQLError;
use graphql_parser::query::{Directive, Field, Type, Value as GqlValue, VariableDefinition};
use serde_json::{Map, Value, json};

/// Key a field's result is stored under (alias or name)
pub fn response_key<'f>(field: &'f Field<'_, String>) -> &'f str {
    field.alias.as_deref().unwrap_or(field.name.as_str())
}

/// All arguments of a field as a JSON object, with variables substituted
pub fn field_arguments(field: &Field<'_, String>, variables: &Map<String, Value>) -> Map<String, Value> {
    field
        .arguments
        .iter()
        .map(|(name, value)| (name.clone(), gql_value_to_json(value, variables)))
        .collect()
}

/// Convert GraphQL value to JSON
///
/// Unknown variables resolve to `null`.
pub fn gql_value_to_json(value: &GqlValue<'_, String>, variables: &Map<String, Value>) -> Value {
    match value {
        GqlValue::Null => Value::Null,
        GqlValue::Int(i) => i.as_i64().map_or(Value::Null, |n| json!(n)),
        GqlValue::Float(f) => json!(f),
        GqlValue::String(s) => json!(s),
        GqlValue::Boolean(b) => json!(b),
        GqlValue::Enum(e) => json!(e),
        GqlValue::List(list) => Value::Array(
            list.iter()
                .map(|item| gql_value_to_json(item, variables))
                .collect(),
        ),
        GqlValue::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), gql_value_to_json(v, variables)))
                .collect(),
        ),
        GqlValue::Variable(name) => variables.get(name).cloned().unwrap_or(Value::Null),
    }
}

/// Coerce the request's variables against the operation's definitions
///
/// Missing variables fall back to their default; a missing non-null
/// variable without a default is an error. Variables the operation does not
/// declare are dropped.
pub fn resolve_variables(
    definitions: &[VariableDefinition<'_, String>],
    provided: Map<String, Value>,
) -> Result<Map<String, Value>, GraphQLError> {
    let empty = Map::new();
    let mut resolved = Map::new();

    for def in definitions {
        let value = match provided.get(&def.name) {
            Some(value) => value.clone(),
            None => match &def.default_value {
                Some(default) => gql_value_to_json(default, &empty),
                None if is_non_null(&def.var_type) => {
                    return Err(GraphQLError::Execution {
                        message: format!(
                            "Variable '${}' of required type '{}' was not provided",
                            def.name,
                            type_name(&def.var_type)
                        ),
                    });
                }
                None => Value::Null,
            },
        };
        resolved.insert(def.name.clone(), value);
    }

    Ok(resolved)
}

fn is_non_null(ty: &Type<'_, String>) -> bool {
    matches!(ty, Type::NonNullType(_))
}

fn type_name(ty: &Type<'_, String>) -> String {
    match ty {
        Type::NamedType(name) => name.clone(),
        Type::ListType(inner) => format!("[{}]", type_name(inner)),
        Type::NonNullType(inner) => format!("{}!", type_name(inner)),
    }
}

/// Evaluate `@skip` and `@include` directives
pub fn should_include(directives: &[Directive<'_, String>], variables: &Map<String, Value>) -> bool {
    for directive in directives {
        let condition = directive
            .arguments
            .iter()
            .find(|(name, _)| name == "if")
            .map(|(_, value)| gql_value_to_json(value, variables))
            .and_then(|v| v.as_bool());

        match (directive.name.as_str(), condition) {
            ("skip", Some(true)) => return false,
            ("include", Some(false)) => return false,
            _ => {}
        }
    }
    true
}
