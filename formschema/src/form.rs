use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, bail};
use serde::Serialize;
use serde_json::Value;

use crate::{
    defaults::default_form_state,
    error::{Result, SchemaError},
    options::FormOptions,
    schema::{AllOfMerger, Resolver, Validator},
    tree::{FieldPath, IdTree, PathTree},
};

/// Callback invoked after a field event has been applied.
///
/// Receives the event and the form data as it is after the event.
pub type HookCallback = Arc<dyn Fn(&FieldEvent, &Value) + Send + Sync>;

/// Hook registration for one field id.
#[derive(Clone)]
pub struct FieldHook {
    /// Field identifier, as found in the [`IdTree`].
    pub id: String,
    /// Callback executed for every event on that field.
    pub callback: HookCallback,
}

/// Something the rendering layer reports about a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEvent {
    /// The field's value was edited.
    Change { id: String, value: Value },
    /// The field lost focus.
    Blur { id: String },
    /// The field gained focus.
    Focus { id: String },
}

impl FieldEvent {
    pub fn id(&self) -> &str {
        match self {
            Self::Change { id, .. } | Self::Blur { id } | Self::Focus { id } => id,
        }
    }
}

/// Snapshot handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormState {
    /// The root schema, resolved against the current form data.
    pub schema: Value,
    pub id_tree: IdTree,
    pub path_tree: PathTree,
    pub form_data: Value,
}

/// A schema-driven form: the root schema, the data being edited and the
/// options used to derive field ids.
#[derive(Clone)]
pub struct FormContext {
    /// Root schema, target of every `$ref`.
    pub schema: Value,
    /// Current form data. `Null` when nothing was loaded.
    pub form_data: Value,
    pub options: FormOptions,
    /// File the form data was loaded from.
    pub data_path: PathBuf,
    /// Whether field events changed the form data since it was loaded.
    pub dirty: bool,
    /// Registered field hooks.
    pub hooks: Vec<FieldHook>,
    merger: Option<Arc<dyn AllOfMerger + Send + Sync>>,
    validator: Option<Arc<dyn Validator + Send + Sync>>,
}

const DEFAULT_DATA_PATH: &str = "form.toml";

/// Derive the schema path that goes with a data file:
/// `dir/settings.toml` becomes `dir/settings-schema.json`.
pub fn default_schema_path(data_path: &Path) -> PathBuf {
    let stem = data_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = format!("{stem}-schema.json");

    match data_path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Parse form data according to the extension of `path`.
///
/// Blank content is `Null`.
pub fn parse_data(content: &str, path: &Path) -> anyhow::Result<Value> {
    if content.trim().is_empty() {
        return Ok(Value::Null);
    }
    let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let value = match ext {
        "json" => serde_json::from_str(content)?,
        "toml" => {
            let v: toml::Value = toml::from_str(content)?;
            serde_json::to_value(v)?
        }
        _ => {
            bail!("Unsupported data file extension: {ext:?}");
        }
    };
    Ok(value)
}

/// Read and parse a `.toml` or `.json` data file.
pub fn read_data_file(path: &Path) -> anyhow::Result<Value> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse_data(&content, path)
}

/// Read a JSON schema file.
pub fn read_schema_file(path: &Path) -> anyhow::Result<Value> {
    if !path.exists() {
        bail!("Schema file does not exist: {}", path.display());
    }
    let content = fs::read_to_string(path)?;
    let schema = serde_json::from_str(&content)
        .with_context(|| format!("Invalid schema in {}", path.display()))?;
    Ok(schema)
}

impl FormContext {
    /// Form over already loaded values, not tied to an existing file.
    pub fn from_values(schema: Value, form_data: Value, options: FormOptions) -> Self {
        Self {
            schema,
            form_data,
            options,
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            dirty: false,
            hooks: Vec::new(),
            merger: None,
            validator: None,
        }
    }

    /// Load a form from an optional data path and an optional schema path.
    ///
    /// When no schema path is given it is derived from the data path with
    /// [`default_schema_path`].
    pub fn new(
        data: Option<impl AsRef<Path>>,
        schema: Option<impl AsRef<Path>>,
    ) -> anyhow::Result<Self> {
        let data_path = Self::data_path_or_default(data);

        let schema_path = match schema {
            Some(sch) => sch.as_ref().to_path_buf(),
            None => default_schema_path(&data_path),
        };

        let schema = read_schema_file(&schema_path)?;
        Self::new_with_schema(Some(data_path), schema)
    }

    fn data_path_or_default(data: Option<impl AsRef<Path>>) -> PathBuf {
        data.map(|p| p.as_ref().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH))
    }

    /// Build a form from data content that has already been read.
    pub fn new_with_init_and_schema(
        init: &str,
        data_path: &Path,
        schema: Value,
    ) -> anyhow::Result<Self> {
        let form_data = parse_data(init, data_path)?;
        let mut ctx = Self::from_values(schema, form_data, FormOptions::default());
        ctx.data_path = data_path.to_path_buf();
        Ok(ctx)
    }

    /// Build a form from a schema value and an optional data path.
    ///
    /// The data file is loaded when it exists; otherwise the form starts
    /// empty.
    pub fn new_with_schema(data: Option<impl AsRef<Path>>, schema: Value) -> anyhow::Result<Self> {
        let data_path = Self::data_path_or_default(data);

        let init = if data_path.exists() {
            fs::read_to_string(&data_path)?
        } else {
            String::new()
        };
        Self::new_with_init_and_schema(&init, &data_path, schema)
    }

    #[must_use]
    pub fn with_options(mut self, options: FormOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the built-in `allOf` merge policy.
    #[must_use]
    pub fn with_merger(mut self, merger: impl AllOfMerger + Send + Sync + 'static) -> Self {
        self.merger = Some(Arc::new(merger));
        self
    }

    /// Replace the built-in condition checks used by dependency `oneOf`s.
    #[must_use]
    pub fn with_validator(mut self, validator: impl Validator + Send + Sync + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Register a callback for events on the field `id`.
    pub fn add_hook(
        &mut self,
        id: impl Into<String>,
        callback: impl Fn(&FieldEvent, &Value) + Send + Sync + 'static,
    ) {
        self.hooks.push(FieldHook {
            id: id.into(),
            callback: Arc::new(callback),
        });
    }

    /// Resolver over this form's root schema with its configured strategies.
    pub fn resolver(&self) -> Resolver<'_> {
        let mut resolver = Resolver::new(&self.schema).with_max_depth(self.options.max_depth);
        if let Some(merger) = &self.merger {
            resolver = resolver.with_merger(&**merger);
        }
        if let Some(validator) = &self.validator {
            resolver = resolver.with_validator(&**validator);
        }
        resolver
    }

    /// Resolved schema and field trees for the current form data.
    ///
    /// The schema is resolved down every visited property, so a `$ref`ed
    /// property shows up with its own `properties` in place.
    pub fn state(&self) -> Result<FormState> {
        let (id_tree, path_tree, schema) = self.trees()?;
        Ok(FormState {
            schema,
            id_tree,
            path_tree,
            form_data: self.form_data.clone(),
        })
    }

    fn trees(&self) -> Result<(IdTree, PathTree, Value)> {
        let resolver = self.resolver();
        let (id_tree, schema) = IdTree::build_resolved(
            &resolver,
            &self.schema,
            &self.options.id_prefix,
            &self.options.id_separator,
            None,
            &self.form_data,
        )?;
        let path_tree = PathTree::build(&resolver, &self.schema, FieldPath::root(), &self.form_data)?;
        Ok((id_tree, path_tree, schema))
    }

    /// Data path of the field with identifier `id`.
    pub fn path_of(&self, id: &str) -> Result<FieldPath> {
        let (id_tree, path_tree, _) = self.trees()?;
        id_tree
            .locate(|candidate| candidate == id)
            .and_then(|keys| path_tree.at(keys.as_slice()))
            .map(|node| node.value.clone())
            .ok_or_else(|| SchemaError::UnknownField { id: id.to_string() })
    }

    /// Apply a field event and run the hooks registered for its field.
    ///
    /// Trees are derived from the data as it is before the event, so a
    /// change that activates a dependency shows up in the next [`state`].
    ///
    /// [`state`]: Self::state
    pub fn handle_event(&mut self, event: FieldEvent) -> Result<()> {
        let path = self.path_of(event.id())?;

        match &event {
            FieldEvent::Change { value, .. } => {
                debug!("set `{path}` to {value}");
                path.set(&mut self.form_data, value.clone())?;
                self.dirty = true;
            }
            FieldEvent::Blur { id } => trace!("blur `{id}`"),
            FieldEvent::Focus { id } => trace!("focus `{id}`"),
        }

        for hook in self.hooks.iter().filter(|hook| hook.id == event.id()) {
            (hook.callback)(&event, &self.form_data);
        }
        Ok(())
    }

    /// Defaults of the root schema merged with the current form data.
    pub fn default_form_state(&self) -> Result<Value> {
        default_form_state(&self.resolver(), &self.schema, &self.form_data)
    }

    /// Replace the form data with [`default_form_state`](Self::default_form_state).
    pub fn apply_defaults(&mut self) -> Result<()> {
        let state = self.default_form_state()?;
        if state != self.form_data {
            self.form_data = state;
            self.dirty = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    fn person_schema() -> Value {
        json!({
            "definitions": {
                "address": {
                    "type": "object",
                    "properties": {
                        "street": {"type": "string"},
                        "city": {"type": "string", "default": "Oslo"},
                    },
                }
            },
            "type": "object",
            "properties": {
                "name": {"type": "string", "default": "anon"},
                "address": {"$ref": "#/definitions/address"},
                "has_pet": {"type": "boolean"},
            },
            "dependencies": {
                "has_pet": {"properties": {"pet_name": {"type": "string"}}}
            },
        })
    }

    fn ctx(form_data: Value) -> FormContext {
        FormContext::from_values(person_schema(), form_data, FormOptions::default())
    }

    #[test]
    fn test_schema_default() {
        let name = "config.toml";
        let expected_schema_name = "config-schema.json";
        let schema_path = default_schema_path(Path::new(name));
        assert_eq!(schema_path, PathBuf::from(expected_schema_name));
        assert_eq!(
            default_schema_path(Path::new("dir/a.b.json")),
            PathBuf::from("dir/a.b-schema.json")
        );
    }

    #[test]
    fn test_state() {
        let state = ctx(Value::Null).state().unwrap();
        assert!(state.schema.get("dependencies").is_none());
        let address = &state.schema["properties"]["address"];
        assert!(address.get("$ref").is_none());
        assert_eq!(address["properties"]["city"], json!({"type": "string", "default": "Oslo"}));
        assert_eq!(
            state.id_tree.at(&["address", "city"]).unwrap().value,
            "root_address_city"
        );
        assert_eq!(
            state.path_tree.at(&["address", "city"]).unwrap().value.to_string(),
            "address.city"
        );
        assert!(state.id_tree.same_shape(&state.path_tree));
    }

    #[test]
    fn test_state_uses_options() {
        let options = FormOptions {
            id_prefix: "form".into(),
            id_separator: ".".into(),
            ..FormOptions::default()
        };
        let state = ctx(Value::Null).with_options(options).state().unwrap();
        assert_eq!(state.id_tree.child("name").unwrap().value, "form.name");
    }

    #[test]
    fn test_change_writes_at_path() {
        let mut ctx = ctx(json!({"name": "Ada"}));
        ctx.handle_event(FieldEvent::Change {
            id: "root_address_city".into(),
            value: json!("Bergen"),
        })
        .unwrap();
        assert_eq!(ctx.form_data, json!({"name": "Ada", "address": {"city": "Bergen"}}));
        assert!(ctx.dirty);
    }

    #[test]
    fn test_change_on_additional_property() {
        let schema = json!({
            "type": "object",
            "properties": {"name": {"type": "string"}},
            "additionalProperties": {"type": "integer"},
        });
        let mut ctx =
            FormContext::from_values(schema, json!({"name": "Ada", "extra": 1}), FormOptions::default());
        assert_eq!(ctx.path_of("root_extra").unwrap().to_string(), "extra");

        ctx.handle_event(FieldEvent::Change {
            id: "root_extra".into(),
            value: json!(2),
        })
        .unwrap();
        assert_eq!(ctx.form_data, json!({"name": "Ada", "extra": 2}));
        let state = ctx.state().unwrap();
        assert_eq!(state.schema["properties"]["extra"]["__additional_property"], true);
    }

    #[test]
    fn test_change_activates_dependency() {
        let mut ctx = ctx(json!({}));
        assert!(ctx.path_of("root_pet_name").is_err());

        ctx.handle_event(FieldEvent::Change {
            id: "root_has_pet".into(),
            value: json!(true),
        })
        .unwrap();
        let state = ctx.state().unwrap();
        assert_eq!(state.id_tree.child("pet_name").unwrap().value, "root_pet_name");
        assert_eq!(ctx.path_of("root_pet_name").unwrap().to_string(), "pet_name");
    }

    #[test]
    fn test_focus_and_blur_only_notify() {
        let mut ctx = ctx(json!({"name": "Ada"}));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        ctx.add_hook("root_name", move |event, data| {
            sink.lock().unwrap().push((event.clone(), data["name"].clone()));
        });

        ctx.handle_event(FieldEvent::Focus { id: "root_name".into() }).unwrap();
        ctx.handle_event(FieldEvent::Change {
            id: "root_name".into(),
            value: json!("Grace"),
        })
        .unwrap();
        ctx.handle_event(FieldEvent::Blur { id: "root_name".into() }).unwrap();
        ctx.handle_event(FieldEvent::Focus { id: "root_address".into() }).unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].1, json!("Ada"));
        assert_eq!(seen[1].1, json!("Grace"));
        assert_eq!(seen[2].0, FieldEvent::Blur { id: "root_name".into() });
    }

    #[test]
    fn test_unknown_field() {
        let mut ctx = ctx(Value::Null);
        let err = ctx
            .handle_event(FieldEvent::Blur { id: "root_nope".into() })
            .unwrap_err();
        assert_eq!(err, SchemaError::UnknownField { id: "root_nope".into() });
        assert!(!ctx.dirty);
    }

    #[test]
    fn test_change_through_scalar_fails() {
        let mut ctx = ctx(json!({"address": "somewhere"}));
        let err = ctx
            .handle_event(FieldEvent::Change {
                id: "root_address_city".into(),
                value: json!("Oslo"),
            })
            .unwrap_err();
        assert!(matches!(err, SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_default_form_state() {
        let mut ctx = ctx(json!({"address": {"street": "Main St"}}));
        assert_eq!(
            ctx.default_form_state().unwrap(),
            json!({"name": "anon", "address": {"city": "Oslo", "street": "Main St"}})
        );
        ctx.apply_defaults().unwrap();
        assert_eq!(ctx.form_data["name"], json!("anon"));
        assert!(ctx.dirty);
    }

    #[test]
    fn test_custom_merger() {
        let schema = json!({
            "allOf": [
                {"properties": {"a": {"type": "string"}}},
                {"properties": {"b": {"type": "string"}}},
            ]
        });
        let last_only = |fragments: &[Value]| -> Result<Value> {
            Ok(fragments.last().cloned().unwrap_or(Value::Null))
        };
        let ctx = FormContext::from_values(schema, Value::Null, FormOptions::default())
            .with_merger(last_only);
        let state = ctx.state().unwrap();
        assert_eq!(state.id_tree.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("person.toml");
        fs::write(&data_path, "name = \"Ada\"\n[address]\ncity = \"Bergen\"\n").unwrap();
        fs::write(
            dir.path().join("person-schema.json"),
            serde_json::to_string(&person_schema()).unwrap(),
        )
        .unwrap();

        let ctx = FormContext::new(Some(&data_path), None::<&Path>).unwrap();
        assert_eq!(ctx.form_data, json!({"name": "Ada", "address": {"city": "Bergen"}}));
        assert_eq!(ctx.data_path, data_path);
    }

    #[test]
    fn test_missing_schema_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("person.json");
        assert!(FormContext::new(Some(&data_path), None::<&Path>).is_err());
    }

    #[test]
    fn test_new_with_schema_without_data_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx =
            FormContext::new_with_schema(Some(dir.path().join("missing.json")), person_schema())
                .unwrap();
        assert_eq!(ctx.form_data, Value::Null);
    }

    #[test]
    fn test_parse_data() {
        assert_eq!(
            parse_data(r#"{"a": 1}"#, Path::new("x.json")).unwrap(),
            json!({"a": 1})
        );
        assert_eq!(parse_data("a = 1", Path::new("x.toml")).unwrap(), json!({"a": 1}));
        assert_eq!(parse_data("  \n", Path::new("x.yaml")).unwrap(), Value::Null);
        assert!(parse_data("a: 1", Path::new("x.yaml")).is_err());
    }
}
