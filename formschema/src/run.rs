use std::path::Path;

use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    form::{FormContext, FormState},
    options::FormOptions,
};

/// Root schema generated for `C`.
pub fn schema_of<C: JsonSchema>() -> anyhow::Result<Value> {
    let schema = schemars::schema_for!(C);
    Ok(serde_json::to_value(&schema)?)
}

/// Form state for the schema of `C` over untyped form data.
///
/// # Errors
///
/// Returns errors when schema generation or resolution fails.
pub fn describe<C: JsonSchema>(form_data: Value, options: FormOptions) -> anyhow::Result<FormState> {
    let schema = schema_of::<C>()?;
    let state = FormContext::from_values(schema, form_data, options).state()?;
    Ok(state)
}

/// Form state for the schema of `C`, filled with `value`.
pub fn describe_value<C: JsonSchema + Serialize>(
    value: &C,
    options: FormOptions,
) -> anyhow::Result<FormState> {
    describe::<C>(serde_json::to_value(value)?, options)
}

/// Form over the schema of `C` and the data file at `data_path`.
///
/// A missing data file gives an empty form.
pub fn context_for<C: JsonSchema>(data_path: impl AsRef<Path>) -> anyhow::Result<FormContext> {
    FormContext::new_with_schema(Some(data_path), schema_of::<C>()?)
}

/// Deserialize the current form data into `C`.
///
/// Fails while required fields are still missing.
pub fn to_typed<C: DeserializeOwned>(ctx: &FormContext) -> anyhow::Result<C> {
    Ok(serde_json::from_value(ctx.form_data.clone())?)
}
