//! Utility macros for reducing boilerplate

/// Implement `FromRef<AppState>` for a cloneable state field so handlers can
/// extract it directly.
///
/// # Example
/// ```ignore
/// impl_from_ref!(Arc<RenderPipeline>, render);
/// // Expands to:
/// impl axum::extract::FromRef<AppState> for Arc<RenderPipeline> {
///     fn from_ref(state: &AppState) -> Self {
///         state.render.clone()
///     }
/// }
/// ```
#[macro_export]
macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl axum::extract::FromRef<$crate::state::AppState> for $type {
            fn from_ref(state: &$crate::state::AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}
