//! Typed hooks over the raw [`RenderContext`] contract.
//!
//! ```rust,ignore
//! let counter = Flow::new("counter", |ctx| {
//!     let (count, set_count) = use_state(ctx, 0i64)?;
//!     let increment = use_callback_sync(ctx, move |_| set_count.set(count + 1))?;
//!     Ok(View::new()
//!         .text(format!("Count: {count}"))
//!         .block(Block::actions(vec![Element::button(increment, "+1")])))
//! });
//! ```

use crate::context::{BoxFuture, EffectContext, RenderContext, StateSetter};
use crate::document::BlockAction;
use crate::error::{Error, Result};
use crate::source::AsyncData;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed handle on one state hook.
pub struct SetState<T> {
    setter: StateSetter,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            setter: self.setter.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetState")
            .field("index", &self.setter.index())
            .finish()
    }
}

impl<T: Serialize> SetState<T> {
    /// Overwrite the state in the current ledger. Fails with
    /// [`Error::Marshal`] when the value cannot be serialized.
    pub fn set(&self, value: T) -> Result<()> {
        let value = serde_json::to_value(&value).map_err(Error::Marshal)?;
        self.setter.set(value)
    }

    pub fn index(&self) -> usize {
        self.setter.index()
    }

    /// Async variant of this setter, addressed at the message `async_data`
    /// describes. Values fed through it arrive via a later resumption.
    pub fn detach(&self, async_data: &AsyncData) -> AsyncSetter<T> {
        AsyncSetter {
            descriptor: async_data.for_hook(self.index()),
            _marker: PhantomData,
        }
    }
}

/// Serializable setter that outlives the request that created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct AsyncSetter<T> {
    descriptor: AsyncData,
    #[serde(skip)]
    _marker: PhantomData<fn(T)>,
}

impl<T: Serialize> AsyncSetter<T> {
    pub fn descriptor(&self) -> &AsyncData {
        &self.descriptor
    }

    /// Descriptor and serialized value, ready for a resumption.
    pub fn prepare(&self, value: T) -> Result<(AsyncData, Value)> {
        let value = serde_json::to_value(&value).map_err(Error::Marshal)?;
        Ok((self.descriptor.clone(), value))
    }
}

pub fn use_state<T>(ctx: &mut RenderContext, initial: T) -> Result<(T, SetState<T>)>
where
    T: Serialize + DeserializeOwned,
{
    use_state_with(ctx, move || initial)
}

/// Like [`use_state`], with a lazily computed initial value.
pub fn use_state_with<T, F>(ctx: &mut RenderContext, init: F) -> Result<(T, SetState<T>)>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> T,
{
    let (index, raw, setter) =
        ctx.add_state(|| serde_json::to_value(init()).map_err(Error::Marshal))?;
    let value =
        serde_json::from_value(raw).map_err(|source| Error::InvalidState { index, source })?;
    Ok((
        value,
        SetState {
            setter,
            _marker: PhantomData,
        },
    ))
}

/// Declare a callback; the returned identifier goes into an element's
/// `action_id`.
pub fn use_callback<F, Fut>(ctx: &mut RenderContext, handler: F) -> Result<String>
where
    F: Fn(BlockAction) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    ctx.add_callback(Arc::new(
        move |action| -> BoxFuture<'static, Result<()>> { Box::pin(handler(action)) },
    ))
}

pub fn use_callback_sync<F>(ctx: &mut RenderContext, handler: F) -> Result<String>
where
    F: Fn(BlockAction) -> Result<()> + Send + Sync + 'static,
{
    ctx.add_callback(Arc::new(move |action| -> BoxFuture<'static, Result<()>> {
        let result = handler(action);
        Box::pin(async move { result })
    }))
}

/// Declare a start effect, run once after the first message exists.
pub fn use_effect<F, Fut>(ctx: &mut RenderContext, effect: F) -> Result<()>
where
    F: FnOnce(EffectContext) -> Fut + Send + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    ctx.add_effect(Box::new(
        move |effect_ctx| -> BoxFuture<'static, Result<()>> { Box::pin(effect(effect_ctx)) },
    ))
}
