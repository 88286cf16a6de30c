use serde_json::Value;

use super::{FieldTree, TreeLabel, Walker};
use crate::{
    error::Result,
    schema::{Resolver, Validator},
};

/// Tree of field identifiers (`root`, `root_name`, `root_address_city`, ...).
pub type IdTree = FieldTree<String>;

impl TreeLabel for String {
    const KEY: &'static str = "$id";

    fn label(&self) -> String {
        self.clone()
    }
}

impl IdTree {
    /// Build the identifier tree for `schema`.
    ///
    /// The root node is labelled `base_id`, or `id_prefix` when no base id is
    /// given; every property below appends `id_separator` and its name.
    pub fn build(
        resolver: &Resolver<'_>,
        schema: &Value,
        id_prefix: &str,
        id_separator: &str,
        base_id: Option<&str>,
        form_data: &Value,
    ) -> Result<Self> {
        Self::build_resolved(resolver, schema, id_prefix, id_separator, base_id, form_data)
            .map(|(tree, _)| tree)
    }

    /// Like [`IdTree::build`], also returning the schema as resolved along
    /// the walk: every visited property and item schema in resolved form.
    pub fn build_resolved(
        resolver: &Resolver<'_>,
        schema: &Value,
        id_prefix: &str,
        id_separator: &str,
        base_id: Option<&str>,
        form_data: &Value,
    ) -> Result<(Self, Value)> {
        let id = base_id.unwrap_or(id_prefix).to_string();
        let child_id = |parent: &String, name: &str| format!("{parent}{id_separator}{name}");
        Walker::new(resolver).walk(schema, id, form_data, &child_id)
    }

    /// Every identifier in the tree, in pre-order.
    pub fn ids(&self) -> Vec<&str> {
        self.values().into_iter().map(String::as_str).collect()
    }
}

/// Build an identifier tree with the default merge policy.
pub fn build_ids(
    validator: &dyn Validator,
    schema: &Value,
    id_prefix: &str,
    id_separator: &str,
    base_id: Option<&str>,
    root_schema: &Value,
    form_data: &Value,
) -> Result<IdTree> {
    let resolver = Resolver::new(root_schema).with_validator(validator);
    IdTree::build(&resolver, schema, id_prefix, id_separator, base_id, form_data)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use ntest::timeout;
    use serde_json::json;

    use super::*;
    use crate::{error::SchemaError, schema::JsonSchemaValidator};

    fn ids(schema: &Value, form_data: &Value) -> IdTree {
        build_ids(
            &JsonSchemaValidator,
            schema,
            "root",
            "_",
            None,
            schema,
            form_data,
        )
        .unwrap()
    }

    #[test]
    fn test_flat_object() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}, "b": {"type": "number"}},
        });
        assert_eq!(
            ids(&schema, &Value::Null).to_json(),
            json!({"$id": "root", "a": {"$id": "root_a"}, "b": {"$id": "root_b"}})
        );
    }

    #[test]
    fn test_base_id_and_separator() {
        let schema = json!({"type": "object", "properties": {"a": {"type": "string"}}});
        let tree = build_ids(
            &JsonSchemaValidator,
            &schema,
            "root",
            ".",
            Some("form"),
            &schema,
            &Value::Null,
        )
        .unwrap();
        assert_eq!(tree.to_json(), json!({"$id": "form", "a": {"$id": "form.a"}}));
    }

    #[test]
    fn test_nested_refs() {
        let schema = json!({
            "definitions": {
                "address": {
                    "type": "object",
                    "properties": {"street": {"type": "string"}, "city": {"type": "string"}},
                }
            },
            "type": "object",
            "properties": {
                "billing": {"$ref": "#/definitions/address"},
                "shipping": {"$ref": "#/definitions/address"},
            },
        });
        let tree = ids(&schema, &Value::Null);
        assert_eq!(
            tree.to_json(),
            json!({
                "$id": "root",
                "billing": {
                    "$id": "root_billing",
                    "street": {"$id": "root_billing_street"},
                    "city": {"$id": "root_billing_city"},
                },
                "shipping": {
                    "$id": "root_shipping",
                    "street": {"$id": "root_shipping_street"},
                    "city": {"$id": "root_shipping_city"},
                },
            })
        );
    }

    #[test]
    fn test_all_of_resolved_before_ids() {
        let schema = json!({
            "allOf": [
                {"properties": {"a": {"type": "string"}}},
                {"properties": {"b": {"type": "number"}}},
            ]
        });
        assert_eq!(
            ids(&schema, &Value::Null).to_json(),
            json!({"$id": "root", "a": {"$id": "root_a"}, "b": {"$id": "root_b"}})
        );
    }

    #[test]
    fn test_array_delegates_to_items() {
        let schema = json!({
            "type": "object",
            "properties": {
                "tags": {"type": "array", "items": {"type": "string"}},
                "points": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"x": {"type": "number"}, "y": {"type": "number"}},
                    },
                },
            },
        });
        assert_eq!(
            ids(&schema, &json!({"points": [{"x": 1}]})).to_json(),
            json!({
                "$id": "root",
                "tags": {"$id": "root_tags"},
                "points": {
                    "$id": "root_points",
                    "x": {"$id": "root_points_x"},
                    "y": {"$id": "root_points_y"},
                },
            })
        );
    }

    #[test]
    fn test_top_level_array() {
        let schema = json!({"type": "array", "items": {"type": "string"}});
        assert_eq!(ids(&schema, &json!(["a"])).to_json(), json!({"$id": "root"}));
    }

    #[test]
    fn test_array_of_refs() {
        let schema = json!({
            "definitions": {
                "item": {"type": "object", "properties": {"label": {"type": "string"}}}
            },
            "type": "object",
            "properties": {
                "items": {"type": "array", "items": {"$ref": "#/definitions/item"}}
            },
        });
        assert_eq!(
            ids(&schema, &Value::Null).to_json(),
            json!({
                "$id": "root",
                "items": {"$id": "root_items", "label": {"$id": "root_items_label"}},
            })
        );
    }

    #[test]
    #[timeout(5000)]
    fn test_recursive_schema_stops() {
        let _ = env_logger::builder().is_test(true).try_init();
        let schema = json!({
            "definitions": {
                "node": {
                    "type": "object",
                    "properties": {
                        "name": {"type": "string"},
                        "children": {"type": "array", "items": {"$ref": "#/definitions/node"}},
                    },
                }
            },
            "type": "object",
            "properties": {"tree": {"$ref": "#/definitions/node"}},
        });
        assert_eq!(
            ids(&schema, &Value::Null).to_json(),
            json!({
                "$id": "root",
                "tree": {
                    "$id": "root_tree",
                    "name": {"$id": "root_tree_name"},
                    "children": {"$id": "root_tree_children"},
                },
            })
        );
    }

    #[test]
    #[timeout(5000)]
    fn test_self_reference_is_a_leaf() {
        let _ = env_logger::builder().is_test(true).try_init();
        let schema = json!({
            "defs": {"node": {"$ref": "#/defs/node"}},
            "type": "object",
            "properties": {"loop": {"$ref": "#/defs/node"}},
        });
        assert_eq!(
            ids(&schema, &Value::Null).to_json(),
            json!({"$id": "root", "loop": {"$id": "root_loop"}})
        );
    }

    #[test]
    fn test_dependencies_follow_form_data() {
        let schema = json!({
            "type": "object",
            "properties": {"has_pet": {"type": "boolean"}},
            "dependencies": {
                "has_pet": {"properties": {"pet_name": {"type": "string"}}}
            },
        });
        assert_eq!(ids(&schema, &json!({})).keys().collect::<Vec<_>>(), vec!["has_pet"]);
        assert_eq!(
            ids(&schema, &json!({"has_pet": true})).keys().collect::<Vec<_>>(),
            vec!["has_pet", "pet_name"]
        );
    }

    #[test]
    fn test_ids_are_unique() {
        let schema = json!({
            "type": "object",
            "properties": {
                "a": {"type": "object", "properties": {"x": {}, "y": {}}},
                "b": {"type": "object", "properties": {"x": {}, "z": {"type": "object", "properties": {"x": {}}}}},
                "c": {"type": "string"},
            },
        });
        let tree = ids(&schema, &Value::Null);
        let all = tree.ids();
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), 9);
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_non_object_property_schemas_are_leaves() {
        let schema = json!({"type": "object", "properties": {"anything": true}});
        assert_eq!(
            ids(&schema, &Value::Null).to_json(),
            json!({"$id": "root", "anything": {"$id": "root_anything"}})
        );
    }

    #[test]
    fn test_missing_reference_propagates() {
        let schema = json!({"type": "object", "properties": {"a": {"$ref": "#/nowhere"}}});
        let err = build_ids(
            &JsonSchemaValidator,
            &schema,
            "root",
            "_",
            None,
            &schema,
            &Value::Null,
        )
        .unwrap_err();
        assert_eq!(
            err,
            SchemaError::Reference {
                pointer: "#/nowhere".into()
            }
        );
    }

    #[test]
    fn test_additional_properties_get_ids() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": true,
        });
        let tree = ids(&schema, &json!({"a": "x", "extra": 1}));
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["a", "extra"]);
        assert_eq!(tree.child("extra").unwrap().value, "root_extra");

        let closed = json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "additionalProperties": false,
        });
        let tree = ids(&closed, &json!({"a": "x", "extra": 1}));
        assert_eq!(tree.keys().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_build_resolved_replaces_walked_nodes() {
        let schema = json!({
            "definitions": {
                "address": {"type": "object", "properties": {"city": {"type": "string"}}}
            },
            "type": "object",
            "properties": {
                "home": {"$ref": "#/definitions/address"},
                "visits": {"type": "array", "items": {"$ref": "#/definitions/address"}},
            },
        });
        let resolver = Resolver::new(&schema);
        let (tree, resolved) =
            IdTree::build_resolved(&resolver, &schema, "root", "_", None, &Value::Null).unwrap();
        let address = &schema["definitions"]["address"];
        assert_eq!(&resolved["properties"]["home"], address);
        assert_eq!(&resolved["properties"]["visits"]["items"], address);
        assert_eq!(resolved["properties"]["visits"]["type"], "array");
        assert_eq!(tree.at(&["visits", "city"]).unwrap().value, "root_visits_city");
    }

    #[test]
    fn test_conflicting_dependency_fails() {
        let schema = json!({
            "type": "object",
            "properties": {"a": {}},
            "dependencies": {"a": {"type": "boolean"}},
        });
        let err = build_ids(
            &JsonSchemaValidator,
            &schema,
            "root",
            "_",
            None,
            &schema,
            &json!({"a": 1}),
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvableComposition { .. }));
    }
}
