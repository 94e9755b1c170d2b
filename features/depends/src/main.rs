use std::{convert::Infallible, future::Future, sync::Arc};

use depends::{
    release_fn, Arguments, CallArgs, Depends, DynError, Factory, InstanceFactory, Operation,
    Signature,
};

fn main() {
    let session = Factory::resource_fn("session", Signature::new().param("user"), |args| async move {
        let user: &String = args.get("user")?;
        println!("open session for {user}");
        let guard = release_fn(|| async {
            println!("close session");
            Ok::<_, Infallible>(())
        });
        Ok::<_, DynError>((format!("session-of-{user}"), guard))
    });
    let greeting = Factory::new(GreetingFactory {
        session: session.clone(),
    });

    let operation = Operation::new(
        "greet",
        Signature::new()
            .param("user")
            .depends("session", Depends::on(&session))
            .depends("greeting", Depends::on(&greeting)),
        |args| async move {
            let session: Arc<String> = args.get_arc("session")?;
            let greeting: &Greeting = args.get("greeting")?;
            Ok::<_, DynError>(format!("{} ({session})", greeting.text))
        },
    );

    let result = futures::executor::block_on(operation.call(CallArgs::new().arg("ferris".to_string())));
    println!("{:?}", result);
}

#[derive(Debug)]
struct Greeting {
    text: String,
}

struct GreetingFactory {
    session: Factory,
}

impl InstanceFactory for GreetingFactory {
    type Provides = Greeting;

    fn signature(&self) -> Signature {
        Signature::new()
            .param("user")
            .depends("session", Depends::on(&self.session))
    }

    fn construct(
        &self,
        args: Arguments,
    ) -> impl Future<Output = Result<Self::Provides, impl Into<DynError>>> + Send {
        async move {
            let user: &String = args.get("user")?;
            let session: &String = args.get("session")?;
            Ok::<_, DynError>(Greeting {
                text: format!("hello {user}, using {session}"),
            })
        }
    }
}
