//! Weaver configuration.
//!
//! Every field has a default matching the ReactiveUI helper library, so an empty
//! JSON object (or no file at all) is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use weaver_ir::{MethodRef, TypeRef};

use crate::errors::WeaveResult;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct WeaverConfig {
    /// Type declaring the `ToFodyProperty` placeholders.
    pub placeholder_type: TypeRef,
    pub placeholder_method: String,
    /// Type declaring the real helper factory.
    pub creation_helper_type: TypeRef,
    pub creation_helper_method: String,
    /// Generic definition of the helper stored in the new field.
    pub helper_type: TypeRef,
    /// Prefix of generated helper fields (`$Foo`).
    pub field_prefix: String,
    pub reactive_interface: TypeRef,
    pub reactive_base_type: TypeRef,
    pub observable_type: TypeRef,
    pub scheduler_type: TypeRef,
    pub mark_generated_code: bool,
    pub generator_name: String,
    pub generator_version: String,
}

impl Default for WeaverConfig {
    fn default() -> Self {
        WeaverConfig {
            placeholder_type: "ReactiveUI.Fody.Helpers.ObservableAsPropertyExtensions".into(),
            placeholder_method: "ToFodyProperty".to_owned(),
            creation_helper_type: "ReactiveUI.OAPHCreationHelperMixin".into(),
            creation_helper_method: "ToProperty".to_owned(),
            helper_type: "ReactiveUI.ObservableAsPropertyHelper`1".into(),
            field_prefix: "$".to_owned(),
            reactive_interface: "ReactiveUI.IReactiveObject".into(),
            reactive_base_type: "ReactiveUI.ReactiveObject".into(),
            observable_type: "System.IObservable`1".into(),
            scheduler_type: "System.Reactive.Concurrency.IScheduler".into(),
            mark_generated_code: true,
            generator_name: env!("CARGO_PKG_NAME").to_owned(),
            generator_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl WeaverConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn load(path: &Path) -> WeaveResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn is_placeholder(&self, method: &MethodRef) -> bool {
        method.declaring_type == self.placeholder_type && method.name == self.placeholder_method
    }

    /// Name of the helper field backing `property`.
    pub fn helper_field_name(&self, property: &str) -> String {
        format!("{}{}", self.field_prefix, property)
    }

    /// `Helper<value>`.
    pub fn helper_of(&self, value: &TypeRef) -> TypeRef {
        self.helper_type.instantiate(std::slice::from_ref(value))
    }

    /// `ToProperty<TObj, TRet>(IObservable<TRet>, TObj, string, bool, IScheduler)`.
    pub fn creation_method(&self, owner: &TypeRef, value: &TypeRef) -> MethodRef {
        MethodRef::new(
            self.creation_helper_type.clone(),
            self.creation_helper_method.clone(),
        )
        .params([
            self.observable_type.instantiate(std::slice::from_ref(value)),
            owner.clone(),
            TypeRef::new("System.String"),
            TypeRef::new("System.Boolean"),
            self.scheduler_type.clone(),
        ])
        .returns(self.helper_of(value))
        .generic([owner.clone(), value.clone()])
    }

    /// `Helper<value>::get_Value`.
    pub fn helper_value_getter(&self, value: &TypeRef) -> MethodRef {
        MethodRef::new(self.helper_of(value), "get_Value")
            .instance()
            .returns(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "field_prefix": "_oaph_", "mark_generated_code": false }}"#).unwrap();

        let config = WeaverConfig::load(file.path()).unwrap();
        assert_eq!(config.field_prefix, "_oaph_");
        assert!(!config.mark_generated_code);
        assert_eq!(config.placeholder_method, "ToFodyProperty");
        assert_eq!(config.helper_field_name("Foo"), "_oaph_Foo");
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = WeaverConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("JSON error"));
    }

    #[test]
    fn creation_method_signature() {
        let config = WeaverConfig::default();
        let method = config.creation_method(&"Demo.Model".into(), &"System.Int32".into());
        assert_eq!(method.params.len(), 5);
        assert!(!method.has_this);
        assert_eq!(
            method.return_type.as_ref().map(TypeRef::as_str),
            Some("ReactiveUI.ObservableAsPropertyHelper`1<System.Int32>")
        );
        assert_eq!(method.params[0].as_str(), "System.IObservable`1<System.Int32>");
    }
}
