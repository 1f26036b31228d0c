//! Capability binding between concrete components and trait objects.
//!
//! A capability names an abstract interface (`dyn ModelClient`, `dyn Agent`,
//! ...). Components list the capabilities they satisfy; the loader uses those
//! bindings to hand out a trait object without the caller naming the concrete
//! type.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{ComponentError, ComponentResult};

/// Type-erased component instance as produced by the loader.
pub type AnyComponent = Box<dyn Any + Send + Sync>;

/// Marker for an abstract interface a loaded component may be checked against.
///
/// ```ignore
/// pub struct ModelClientCapability;
///
/// impl Capability for ModelClientCapability {
///     type Object = dyn ModelClient;
///     const NAME: &'static str = "model_client";
/// }
/// ```
pub trait Capability: 'static {
    /// Trait object handed out when the capability is satisfied.
    type Object: ?Sized + Send + Sync + 'static;

    /// Name used in diagnostics.
    const NAME: &'static str;
}

type ErasedCast = Arc<dyn Fn(AnyComponent) -> Result<AnyComponent, AnyComponent> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct CapabilityCast {
    id: TypeId,
    name: &'static str,
    cast: ErasedCast,
}

impl CapabilityCast {
    pub(crate) const fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn is<C: Capability>(&self) -> bool {
        self.id == TypeId::of::<C>()
    }
}

impl fmt::Debug for CapabilityCast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapabilityCast").field(&self.name).finish()
    }
}

/// Capabilities a component type declares in
/// [`Component::capabilities`](crate::Component::capabilities).
pub struct CapabilitySet<T> {
    casts: Vec<CapabilityCast>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> CapabilitySet<T>
where
    T: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        Self {
            casts: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Declares that `T` satisfies capability `C` via the supplied coercion.
    ///
    /// The coercion is usually the identity closure written against the trait
    /// object type, e.g. `|client| client as Box<dyn ModelClient>`.
    pub fn provide<C: Capability>(&mut self, cast: fn(Box<T>) -> Box<C::Object>) -> &mut Self {
        let erased: ErasedCast = Arc::new(move |instance: AnyComponent| {
            instance
                .downcast::<T>()
                .map(|concrete| Box::new(cast(concrete)) as AnyComponent)
        });
        self.casts.retain(|existing| !existing.is::<C>());
        self.casts.push(CapabilityCast {
            id: TypeId::of::<C>(),
            name: C::NAME,
            cast: erased,
        });
        self
    }

    pub(crate) fn into_casts(self) -> Vec<CapabilityCast> {
        self.casts
    }
}

impl<T> fmt::Debug for CapabilitySet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.casts.iter().map(CapabilityCast::name))
            .finish()
    }
}

/// Converts an erased instance into the trait object for `C`.
pub(crate) fn cast_instance<C: Capability>(
    casts: &[CapabilityCast],
    provider: &str,
    instance: AnyComponent,
) -> ComponentResult<Box<C::Object>> {
    let mismatch = || ComponentError::CapabilityMismatch {
        provider: provider.to_owned(),
        capability: C::NAME.to_owned(),
    };

    let binding = casts.iter().find(|c| c.is::<C>()).ok_or_else(mismatch)?;
    let object = (binding.cast)(instance).map_err(|_| mismatch())?;
    object
        .downcast::<Box<C::Object>>()
        .map(|boxed| *boxed)
        .map_err(|_| mismatch())
}
