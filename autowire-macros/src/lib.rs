use proc_macro::TokenStream;

mod component;

/// Derives `autowire::metadata::Component` and submits the type to the
/// catalog.
///
/// # Example
/// ```ignore
/// use autowire::Component;
/// use autowire::prelude::*;
///
/// #[derive(Component)]
/// #[component(
///     register(lifetime = "singleton"),
///     register(lifetime = "transient", service = "Arc<dyn Greeter>", into = "Widget::greeter"),
///     environment(disabled = "Test"),
/// )]
/// pub struct Widget {
///     log: Arc<dyn Logger>,
///     #[resolve(Named::new("db"))]
///     conn: Arc<dyn Connection>,
///     #[property]
///     #[resolve(Constant::new(Settings::tuned()))]
///     pub settings: Settings,
/// }
///
/// impl Widget {
///     fn greeter(self) -> Arc<dyn Greeter> {
///         Arc::new(self)
///     }
/// }
/// ```
///
/// Container attributes (`#[component(...)]`):
/// - `register(lifetime = "...", service = "Type", into = "path", name = "...")`:
///   one registration declaration, repeatable. `service` exposes the
///   component as another type, converted by the `into` function. Without
///   `into` the conversion is `Into::into`, so the crate must provide
///   `impl From<Widget> for Service`.
/// - `environment(enabled = "A, B", disabled = "C")`: environment gate.
/// - `skip_scan`: do not submit the type to the catalog.
///
/// Field attributes:
/// - `#[resolve(expr)]`: custom resolver for the field.
/// - `#[property]`: the field is not a constructor parameter; it starts
///   from `Default::default()` and is injected after construction if it is
///   `pub` and has a resolver.
#[proc_macro_derive(Component, attributes(component, resolve, property))]
pub fn derive_component(input: TokenStream) -> TokenStream {
    component::derive_component(input)
}
