//! Selection-set projection of resolved values

use graphql_parser::query::{FragmentDefinition, Selection, TypeCondition};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::utils::{response_key, should_include};

/// Fragments of the executed document, by name
pub type Fragments<'d, 'a> = HashMap<&'d str, &'d FragmentDefinition<'a, String>>;

/// Everything needed to trim a value to a selection set
pub struct Projection<'p, 'd, 'a> {
    pub fragments: &'p Fragments<'d, 'a>,
    pub variables: &'p Map<String, Value>,
}

impl Projection<'_, '_, '_> {
    /// Keep only the selected fields of `value`
    ///
    /// Lists are projected element-wise and scalars (including a vetoed
    /// mutation's `false`) pass through unchanged. `__typename` answers
    /// `type_name`; nested objects are trimmed by their own selections.
    pub fn project(&self, value: Value, selections: &[Selection<'_, String>], type_name: &str) -> Value {
        if selections.is_empty() {
            return value;
        }
        match value {
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.project(item, selections, type_name))
                    .collect(),
            ),
            Value::Object(obj) => {
                let mut out = Map::new();
                self.collect(&obj, selections, type_name, &mut out);
                Value::Object(out)
            }
            other => other,
        }
    }

    fn collect(
        &self,
        obj: &Map<String, Value>,
        selections: &[Selection<'_, String>],
        type_name: &str,
        out: &mut Map<String, Value>,
    ) {
        for selection in selections {
            match selection {
                Selection::Field(field) => {
                    if !should_include(&field.directives, self.variables) {
                        continue;
                    }
                    let key = response_key(field).to_string();
                    let value = if field.name == "__typename" {
                        Value::String(type_name.to_string())
                    } else {
                        let nested = obj.get(&field.name).cloned().unwrap_or(Value::Null);
                        self.project(nested, &field.selection_set.items, "JSON")
                    };
                    out.insert(key, value);
                }
                Selection::FragmentSpread(spread) => {
                    if !should_include(&spread.directives, self.variables) {
                        continue;
                    }
                    if let Some(fragment) = self.fragments.get(spread.fragment_name.as_str()) {
                        if applies(Some(&fragment.type_condition), type_name) {
                            self.collect(obj, &fragment.selection_set.items, type_name, out);
                        }
                    }
                }
                Selection::InlineFragment(inline) => {
                    if should_include(&inline.directives, self.variables)
                        && applies(inline.type_condition.as_ref(), type_name)
                    {
                        self.collect(obj, &inline.selection_set.items, type_name, out);
                    }
                }
            }
        }
    }
}

fn applies(condition: Option<&TypeCondition<'_, String>>, type_name: &str) -> bool {
    match condition {
        Some(TypeCondition::On(on)) => on == type_name,
        None => true,
    }
}
