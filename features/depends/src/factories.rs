use std::{convert::Infallible, fmt::Debug, future::Future, sync::Arc};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    arguments::Arguments,
    signature::Signature,
    types::{DynError, Injectable, Value},
};

/// A Factory producing a value from its bound arguments
pub trait InstanceFactory: Send + Sync + 'static {
    type Provides: Injectable;

    /// Name used in logs and errors
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the parameters the factory expects
    fn signature(&self) -> Signature;

    /// Constructs a new value of the factory's provided type
    fn construct(
        &self,
        args: Arguments,
    ) -> impl Future<Output = Result<Self::Provides, impl Into<DynError>>> + Send;
}

/// A two phase factory - acquires a value and hands back a guard releasing it after the call
pub trait ResourceFactory: Send + Sync + 'static {
    type Provides: Injectable;
    type Guard: Release;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn signature(&self) -> Signature;

    /// Acquires the value
    ///
    /// The guard is released once, after the operation body finished or failed.
    fn acquire(
        &self,
        args: Arguments,
    ) -> impl Future<Output = Result<(Self::Provides, Self::Guard), impl Into<DynError>>> + Send;
}

/// Second phase of a [ResourceFactory]
pub trait Release: Send + 'static {
    fn release(self) -> impl Future<Output = Result<(), impl Into<DynError>>> + Send;
}

impl Release for () {
    fn release(self) -> impl Future<Output = Result<(), impl Into<DynError>>> + Send {
        async { Ok::<_, Infallible>(()) }
    }
}

/// [Release] running a closure
pub struct ReleaseFn<F>(F);

/// Creates a guard running `f` on release
pub fn release_fn<F, Fut, E>(f: F) -> ReleaseFn<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Into<DynError>,
{
    ReleaseFn(f)
}

impl<F, Fut, E> Release for ReleaseFn<F>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send,
    E: Into<DynError>,
{
    fn release(self) -> impl Future<Output = Result<(), impl Into<DynError>>> + Send {
        (self.0)()
    }
}

/// Releases an acquired value
pub(crate) type BoxedRelease = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), DynError>> + Send>;

/// A produced value and, for two phase factories, how to release it
pub(crate) struct Produced {
    pub value: Value,
    pub release: Option<BoxedRelease>,
}

/// Wrapper Trait for factories, producing type erased values
pub(crate) trait DynFactory: Send + Sync {
    fn name(&self) -> &'static str;

    fn signature(&self) -> &Signature;

    fn is_resource(&self) -> bool;

    fn produce(&self, args: Arguments) -> BoxFuture<'_, Result<Produced, DynError>>;
}

struct Instance<F> {
    factory: F,
    signature: Signature,
}

impl<F: InstanceFactory> DynFactory for Instance<F> {
    fn name(&self) -> &'static str {
        self.factory.name()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn is_resource(&self) -> bool {
        false
    }

    fn produce(&self, args: Arguments) -> BoxFuture<'_, Result<Produced, DynError>> {
        async move {
            let value = self.factory.construct(args).await.map_err(Into::into)?;
            Ok(Produced {
                value: Value::new(value),
                release: None,
            })
        }
        .boxed()
    }
}

struct Resource<F> {
    factory: F,
    signature: Signature,
}

impl<F: ResourceFactory> DynFactory for Resource<F> {
    fn name(&self) -> &'static str {
        self.factory.name()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn is_resource(&self) -> bool {
        true
    }

    fn produce(&self, args: Arguments) -> BoxFuture<'_, Result<Produced, DynError>> {
        async move {
            let (value, guard) = self.factory.acquire(args).await.map_err(Into::into)?;
            let release: BoxedRelease = Box::new(move || {
                async move { guard.release().await.map_err(Into::into) }.boxed()
            });
            Ok(Produced {
                value: Value::new(value),
                release: Some(release),
            })
        }
        .boxed()
    }
}

/// A factory built from a closure, see [Factory::from_fn]
pub struct FnFactory<F> {
    name: &'static str,
    signature: Signature,
    f: F,
}

impl<F, Fut, T, E> InstanceFactory for FnFactory<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send,
    T: Injectable,
    E: Into<DynError>,
{
    type Provides = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    fn construct(
        &self,
        args: Arguments,
    ) -> impl Future<Output = Result<T, impl Into<DynError>>> + Send {
        (self.f)(args)
    }
}

/// A two phase factory built from a closure, see [Factory::resource_fn]
pub struct FnResource<F> {
    name: &'static str,
    signature: Signature,
    f: F,
}

impl<F, Fut, T, G, E> ResourceFactory for FnResource<F>
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(T, G), E>> + Send,
    T: Injectable,
    G: Release,
    E: Into<DynError>,
{
    type Provides = T;
    type Guard = G;

    fn name(&self) -> &'static str {
        self.name
    }

    fn signature(&self) -> Signature {
        self.signature.clone()
    }

    fn acquire(
        &self,
        args: Arguments,
    ) -> impl Future<Output = Result<(T, G), impl Into<DynError>>> + Send {
        (self.f)(args)
    }
}

/// Identity of a [Factory] handle
///
/// All clones of a handle share one identity, two handles created separately never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactoryId(usize);

/// Shared handle to a factory
#[derive(Clone)]
pub struct Factory(Arc<dyn DynFactory>);

impl Factory {
    pub fn new<F: InstanceFactory>(factory: F) -> Self {
        let signature = factory.signature();
        Factory(Arc::new(Instance { factory, signature }))
    }

    pub fn resource<F: ResourceFactory>(factory: F) -> Self {
        let signature = factory.signature();
        Factory(Arc::new(Resource { factory, signature }))
    }

    /// Creates a single phase factory from a closure
    pub fn from_fn<F, Fut, T, E>(name: &'static str, signature: Signature, f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Injectable,
        E: Into<DynError>,
    {
        Factory::new(FnFactory { name, signature, f })
    }

    /// Creates a two phase factory from a closure returning the value and its guard
    pub fn resource_fn<F, Fut, T, G, E>(name: &'static str, signature: Signature, f: F) -> Self
    where
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(T, G), E>> + Send,
        T: Injectable,
        G: Release,
        E: Into<DynError>,
    {
        Factory::resource(FnResource { name, signature, f })
    }

    pub fn id(&self) -> FactoryId {
        FactoryId(Arc::as_ptr(&self.0).cast::<()>() as usize)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    pub fn signature(&self) -> &Signature {
        self.0.signature()
    }

    pub fn is_resource(&self) -> bool {
        self.0.is_resource()
    }

    pub(crate) fn produce(&self, args: Arguments) -> BoxFuture<'_, Result<Produced, DynError>> {
        self.0.produce(args)
    }
}

impl Debug for Factory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Factory")
            .field("name", &self.name())
            .field("resource", &self.is_resource())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use futures::executor::block_on;

    use super::*;
    use crate::arguments::bind;

    struct Greeter;

    impl InstanceFactory for Greeter {
        type Provides = String;

        fn signature(&self) -> Signature {
            Signature::new().param("name")
        }

        fn construct(
            &self,
            args: Arguments,
        ) -> impl Future<Output = Result<String, impl Into<DynError>>> + Send {
            async move {
                let name: &&str = args.get("name")?;
                Ok::<_, DynError>(format!("hello {name}"))
            }
        }
    }

    fn args_for(factory: &Factory, name: &'static str) -> Arguments {
        bind(
            factory.signature(),
            vec![Value::new(name)],
            Default::default(),
        )
        .unwrap()
    }

    #[test]
    fn instance_factory_produces_without_release() {
        let factory = Factory::new(Greeter);
        assert!(factory.name().ends_with("Greeter"));
        assert!(!factory.is_resource());

        let produced = block_on(factory.produce(args_for(&factory, "world"))).unwrap();
        assert_eq!(produced.value.downcast_ref::<String>().unwrap(), "hello world");
        assert!(produced.release.is_none());
    }

    #[test]
    fn resource_release_runs_guard() {
        static RELEASED: AtomicBool = AtomicBool::new(false);

        let factory = Factory::resource_fn("conn", Signature::new(), |_| async {
            let guard = release_fn(|| async {
                RELEASED.store(true, Ordering::SeqCst);
                Ok::<_, Infallible>(())
            });
            Ok::<_, Infallible>((7_u8, guard))
        });
        assert!(factory.is_resource());

        let produced = block_on(factory.produce(Arguments::default())).unwrap();
        assert_eq!(produced.value.downcast_ref::<u8>(), Ok(&7));
        assert!(!RELEASED.load(Ordering::SeqCst));

        let release = produced.release.unwrap();
        block_on(release()).unwrap();
        assert!(RELEASED.load(Ordering::SeqCst));
    }

    #[test]
    fn identity_follows_the_handle() {
        let factory = Factory::from_fn("a", Signature::new(), |_| async { Ok::<_, Infallible>(1) });
        let twin = Factory::from_fn("a", Signature::new(), |_| async { Ok::<_, Infallible>(1) });

        assert_eq!(factory.id(), factory.clone().id());
        assert_ne!(factory.id(), twin.id());
    }
}
