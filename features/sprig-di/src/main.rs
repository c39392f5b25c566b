use std::sync::Arc;

use sprig_di::{args, Bean, Container, Error, Inject, Logger, Wiring};

struct Zero {
    int: i32,
}
impl Bean for Zero {}

#[derive(Default)]
struct One {
    zero: Inject<Arc<Zero>>,
}
impl Bean for One {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.zero, "")
    }
}

struct Two {
    one: Arc<One>,
    greeting: String,
    log: Inject<Logger>,
}
impl Two {
    fn new(one: Arc<One>, greeting: String) -> Self {
        Two {
            one,
            greeting,
            log: Inject::new(),
        }
    }
}
impl Bean for Two {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.logger(&self.log)
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut container = Container::new();
    container.property("greeting", "hello")?;
    container.object(Zero { int: 5 })?;
    container.object(One::default())?;
    container
        .provide(Two::new, args!["", "${greeting:=hi}"])?
        .destroy(|two: &Two| two.log.in_scope(|| tracing::info!("two destroyed")));
    container.refresh()?;

    let two: Arc<Two> = container.get("")?;
    println!("{} {}", two.greeting, two.one.zero.int);
    for bean in container.find("")? {
        println!("{bean}");
    }

    container.close().await;
    Ok(())
}
