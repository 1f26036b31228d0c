//! Instance to envelope conversion.

use component_primitives::{ComponentModel, ProviderId, json_kind};
use serde_json::Value;
use tracing::debug;

use crate::component::Component;
use crate::error::{ComponentError, ComponentResult};
use crate::secrets::omit_secrets;

/// Dumps a component to its config envelope.
///
/// Provider, type label and version come from the component's type; the
/// payload is `to_config` with every schema-declared secret field removed.
///
/// # Errors
///
/// Returns [`ComponentError::Construction`] when `to_config` fails or the
/// config does not serialize to a JSON object, and
/// [`ComponentError::InvalidDefinition`] when the declared provider id or
/// version is malformed.
pub fn dump<T: Component>(component: &T) -> ComponentResult<ComponentModel> {
    let provider = ProviderId::new(T::PROVIDER)?;

    let config = component
        .to_config()
        .map_err(|source| ComponentError::construction(T::PROVIDER, source))?;
    let value = serde_json::to_value(config)
        .map_err(|err| ComponentError::construction(T::PROVIDER, err))?;
    let mut config = match value {
        Value::Object(map) => map,
        other => {
            return Err(ComponentError::construction(
                T::PROVIDER,
                format!("config must serialize to an object, found {}", json_kind(&other)),
            ));
        }
    };

    omit_secrets(&T::config_schema(), &mut config);

    let mut builder = ComponentModel::builder(provider)
        .component_type(T::COMPONENT_TYPE)
        .version(T::VERSION)?
        .config(config);
    if let Some(description) = T::DESCRIPTION {
        builder = builder.description(description);
    }

    debug!(provider = T::PROVIDER, version = T::VERSION, "component dumped");
    Ok(builder.build())
}

/// Dumps a component to canonical JSON text.
///
/// # Errors
///
/// See [`dump`].
pub fn dump_str<T: Component>(component: &T) -> ComponentResult<String> {
    let envelope = dump(component)?;
    serde_json::to_string(&envelope).map_err(|err| ComponentError::construction(T::PROVIDER, err))
}
