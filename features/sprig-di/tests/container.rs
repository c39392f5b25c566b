use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use parking_lot::Mutex;
use proptest::prelude::*;
use sprig_di::{
    args,
    cond::{on_bean, on_profile, on_property},
    Arg, Bean, BeanBuilder, Container, ContainerConfig, Context, Error, ErrorKind, Inject,
    OptionArg, Options, Selector, Wiring, ALLOW_CIRCULAR_REFERENCES,
};

type Journal = Arc<Mutex<Vec<String>>>;

fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

// ###############################################
// Simple object graph

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

#[derive(Default)]
struct Two {
    one: Inject<Arc<One>>,
}
impl Bean for Two {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.one, "")
    }
}

fn graph(container: &mut Container) {
    container.object(One::default()).unwrap();
    container.object(Two::default()).unwrap();
}

#[test]
fn wires_a_simple_object_graph() {
    let mut container = Container::new();
    container.object(Zero { int: 5 }).unwrap();
    graph(&mut container);
    container.refresh().unwrap();

    let two: Arc<Two> = container.get("").unwrap();
    assert_eq!(two.one.zero.int, 5);

    let by_name: Arc<Zero> = container.get("Zero").unwrap();
    let by_type: Arc<Zero> = container.get("Zero:").unwrap();
    assert!(Arc::ptr_eq(&by_name, &*two.one.zero));
    assert!(Arc::ptr_eq(&by_type, &by_name));
}

#[test]
fn primary_breaks_ties() {
    let mut container = Container::new();
    container.object(Zero { int: 5 }).unwrap().name("five");
    container.object(Zero { int: 6 }).unwrap().name("six").primary();
    graph(&mut container);
    container.refresh().unwrap();

    let two: Arc<Two> = container.get("").unwrap();
    assert_eq!(two.one.zero.int, 6);
    let five: Arc<Zero> = container.get("five").unwrap();
    assert_eq!(five.int, 5);
}

#[test]
fn ambiguous_lookups_fail() {
    let mut container = Container::new();
    container.object(Zero { int: 5 }).unwrap().name("five");
    container.object(Zero { int: 6 }).unwrap().name("six");
    container.refresh().unwrap();
    let err = container.get::<Arc<Zero>>("").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::AmbiguousBean);

    let mut container = Container::new();
    container.object(Zero { int: 5 }).unwrap().name("five").primary();
    container.object(Zero { int: 6 }).unwrap().name("six").primary();
    container.refresh().unwrap();
    let err = container.get::<Arc<Zero>>("").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::AmbiguousPrimary);
}

#[test]
fn ambiguity_inside_refresh_carries_the_wiring_path() {
    let mut container = Container::new();
    container.object(Zero { int: 5 }).unwrap().name("five");
    container.object(Zero { int: 6 }).unwrap().name("six");
    container.object(One::default()).unwrap();

    let err = container.refresh().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AmbiguousBean);
    let Error::Wiring { path, .. } = &err else {
        panic!("expected a wiring path, got {err}");
    };
    assert!(path.starts_with("=> container::One:One"), "{path}");
    assert!(matches!(err.root(), Error::AmbiguousBean { .. }));
}

#[test]
fn duplicate_ids_fail() {
    let mut container = Container::new();
    container.object(Zero { int: 5 }).unwrap();
    container.object(Zero { int: 6 }).unwrap();
    let err = container.refresh().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateBean);
}

// ###############################################
// Conditions

#[test]
fn profiles_exclude_beans() {
    let mut container = Container::new();
    container.object(Zero { int: 5 }).unwrap().on(on_profile("test"));
    container.refresh().unwrap();
    let err = container.get::<Arc<Zero>>("").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::NoSuchBean);

    let mut container = Container::new();
    container.property("profile", "test").unwrap();
    container.object(Zero { int: 5 }).unwrap().on(on_profile("test"));
    container.refresh().unwrap();
    assert_eq!(container.get::<Arc<Zero>>("").unwrap().int, 5);
}

static EXCLUDED_CALLS: AtomicUsize = AtomicUsize::new(0);

struct Excluded;
impl Excluded {
    fn new() -> Self {
        EXCLUDED_CALLS.fetch_add(1, Ordering::SeqCst);
        Excluded
    }
}
impl Bean for Excluded {}

#[test]
fn excluded_beans_are_never_built() {
    let mut container = Container::new();
    container
        .provide(Excluded::new, args![])
        .unwrap()
        .on(on_property("feature.enabled"));
    container.object(Zero { int: 1 }).unwrap().on(on_bean("Excluded"));
    container.refresh().unwrap();

    assert_eq!(EXCLUDED_CALLS.load(Ordering::SeqCst), 0);
    assert!(container.find("Excluded").unwrap().is_empty());
    assert!(container.find(Selector::of::<Zero>()).unwrap().is_empty());
    assert!(container.get::<Option<Arc<Excluded>>>("").unwrap().is_none());
}

// ###############################################
// Method beans

struct Server {
    version: Inject<String>,
}
impl Bean for Server {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.value(&self.version, "${server.version}")
    }
}
impl Server {
    fn consumer(self: Arc<Self>) -> Consumer {
        Consumer { server: self }
    }
}

struct Consumer {
    server: Arc<Server>,
}
impl Bean for Consumer {}

fn server() -> Server {
    Server {
        version: Inject::new(),
    }
}

#[test]
fn method_beans_use_their_parent() {
    let mut container = Container::new();
    container.property("server.version", "1.0.0").unwrap();
    container.object(server()).unwrap();
    let consumer = container
        .provide(Server::consumer, args![Arg::parent("")])
        .unwrap()
        .id();
    container.refresh().unwrap();

    let found = container.find(Selector::of::<Consumer>()).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id(), consumer);
    assert!(found[0].is_method());

    let consumer: Arc<Consumer> = container.get("").unwrap();
    assert_eq!(*consumer.server.version, "1.0.0");
}

#[test]
fn method_beans_follow_their_parent_out() {
    let mut container = Container::new();
    container
        .object(server())
        .unwrap()
        .on(on_property("server.enabled"));
    container
        .provide(Server::consumer, args![Arg::parent("")])
        .unwrap();
    container.refresh().unwrap();

    let err = container.get::<Arc<Consumer>>("").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::NoSuchBean);
}

#[test]
fn misplaced_parents_are_rejected() {
    let mut container = Container::new();
    let err = container
        .provide(|_: u8, _: Arc<Server>| Zero { int: 0 }, args!["${x:=1}", Arg::parent("")])
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidBean);
}

// ###############################################
// Collections

struct Node {
    id: i32,
}
impl Bean for Node {}

#[derive(Default)]
struct Nodes {
    all: Inject<Vec<Arc<Node>>>,
    anchored: Inject<Vec<Arc<Node>>>,
}
impl Bean for Nodes {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.all, "")?;
        ctx.autowire(&self.anchored, "${nodes.order:=*}")
    }
}

fn ids(nodes: &[Arc<Node>]) -> Vec<i32> {
    nodes.iter().map(|node| node.id).collect()
}

#[test]
fn collections_follow_bean_order() {
    let mut container = Container::new();
    for id in [2, 1, 3] {
        container
            .object(Node { id })
            .unwrap()
            .name(format!("n{id}"))
            .order(id);
    }
    container.object(Nodes::default()).unwrap();
    container.refresh().unwrap();

    let nodes: Arc<Nodes> = container.get("").unwrap();
    assert_eq!(ids(&nodes.all), vec![1, 2, 3]);
    assert_eq!(ids(&nodes.anchored), vec![1, 2, 3]);
}

#[test]
fn collections_follow_the_tag_list() {
    let mut container = Container::new();
    container.property("nodes.order", "n1,*,n3").unwrap();
    for id in [4, 3, 2, 1] {
        container
            .object(Node { id })
            .unwrap()
            .name(format!("n{id}"))
            .order(id);
    }
    container.object(Nodes::default()).unwrap();
    container.refresh().unwrap();

    let nodes: Arc<Nodes> = container.get("").unwrap();
    assert_eq!(ids(&nodes.anchored), vec![1, 2, 4, 3]);

    let named: std::collections::HashMap<String, Arc<Node>> = container.get("n2,n4").unwrap();
    assert_eq!(named.len(), 2);
    assert_eq!(named["n4"].id, 4);

    let err = container.get::<Vec<Arc<Node>>>("*,n1,*").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::InvalidTag);
    let err = container.get::<Vec<Arc<Node>>>("n9").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::NoSuchBean);
    assert!(container.get::<Vec<Arc<Node>>>("n9?").unwrap().is_empty());
}

// ###############################################
// Exports

trait Greet: Send + Sync {
    fn greet(&self) -> String;
}

struct English;
impl Greet for English {
    fn greet(&self) -> String {
        "hello".into()
    }
}
impl Bean for English {
    fn describe(bean: &mut BeanBuilder<'_, Self>) {
        bean.export(|english| english as Arc<dyn Greet>);
    }
}

struct German;
impl Greet for German {
    fn greet(&self) -> String {
        "hallo".into()
    }
}
impl Bean for German {}

#[test]
fn trait_objects_resolve_through_exports() {
    let mut container = Container::new();
    container.object(English).unwrap();
    container
        .object(German)
        .unwrap()
        .export(|german| german as Arc<dyn Greet>);
    container.refresh().unwrap();

    let greeters: Vec<Arc<dyn Greet>> = container.get("").unwrap();
    assert_eq!(greeters.len(), 2);
    let german: Arc<dyn Greet> = container.get("German").unwrap();
    assert_eq!(german.greet(), "hallo");
    let english: Arc<dyn Greet> = container.get("Greet:English").unwrap();
    assert_eq!(english.greet(), "hello");
}

#[test]
fn concrete_exports_are_rejected() {
    let mut container = Container::new();
    container.object(German).unwrap().export(|german| german);
    let err = container.refresh().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExportConflict);
}

// ###############################################
// Nullable selectors

struct Missing;
impl Bean for Missing {}

#[derive(Default)]
struct Tolerant {
    missing: Inject<Option<Arc<Missing>>>,
    named: Inject<Option<Arc<Zero>>>,
}
impl Bean for Tolerant {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.missing, "?")?;
        ctx.autowire(&self.named, "Zero:other?")
    }
}

#[derive(Default)]
struct Strict {
    missing: Inject<Arc<Missing>>,
}
impl Bean for Strict {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.missing, "")
    }
}

#[test]
fn nullable_selectors_yield_nothing() {
    let mut container = Container::new();
    container.object(Zero { int: 1 }).unwrap();
    container.object(Tolerant::default()).unwrap();
    container.refresh().unwrap();

    let tolerant: Arc<Tolerant> = container.get("").unwrap();
    assert!(tolerant.missing.is_none());
    assert!(tolerant.named.is_none());

    let mut container = Container::new();
    container.object(Strict::default()).unwrap();
    let err = container.refresh().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSuchBean);
}

// ###############################################
// Cycles

static CYCLE_INITS: AtomicUsize = AtomicUsize::new(0);

struct Chicken {
    _egg: Arc<Egg>,
}
struct Egg {
    _chicken: Arc<Chicken>,
}
impl Bean for Chicken {
    fn describe(bean: &mut BeanBuilder<'_, Self>) {
        bean.init(|_: &Chicken| {
            CYCLE_INITS.fetch_add(1, Ordering::SeqCst);
        });
    }
}
impl Bean for Egg {
    fn describe(bean: &mut BeanBuilder<'_, Self>) {
        bean.init(|_: &Egg| {
            CYCLE_INITS.fetch_add(1, Ordering::SeqCst);
        });
    }
}

#[test]
fn constructor_cycles_fail() {
    let mut container = Container::new();
    container
        .provide(|egg: Arc<Egg>| Chicken { _egg: egg }, args![])
        .unwrap();
    container
        .provide(|chicken: Arc<Chicken>| Egg { _chicken: chicken }, args![])
        .unwrap();

    let err = container.refresh().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularConstruction);
    assert_eq!(CYCLE_INITS.load(Ordering::SeqCst), 0);
}

#[derive(Default)]
struct Left {
    right: Inject<Arc<Right>>,
}
impl Bean for Left {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.right, "")
    }
}

#[derive(Default)]
struct Right {
    left: Inject<Arc<Left>>,
}
impl Bean for Right {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.left, "")
    }
}

#[test]
fn value_beans_may_form_cycles() {
    let mut container = Container::new();
    container.object(Left::default()).unwrap();
    container.object(Right::default()).unwrap();
    container.refresh().unwrap();

    let left: Arc<Left> = container.get("").unwrap();
    assert!(Arc::ptr_eq(&*left.right.left, &left));
}

#[derive(Default)]
struct Registry {
    plugin: Inject<Arc<Plugin>>,
}
impl Bean for Registry {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.plugin, "Plugin,lazy")
    }
}

struct Plugin {
    registry: Arc<Registry>,
}
impl Bean for Plugin {}

fn lazy_container() -> Container {
    let mut container = Container::new();
    container.object(Registry::default()).unwrap();
    container
        .provide(|registry: Arc<Registry>| Plugin { registry }, args![])
        .unwrap();
    container
}

#[test]
fn lazy_fields_need_circular_references() {
    let mut container = lazy_container();
    let err = container.refresh().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CircularReferences);
}

#[test]
fn lazy_fields_are_filled_last() {
    let mut container = lazy_container();
    container.property(ALLOW_CIRCULAR_REFERENCES, "true").unwrap();
    container.refresh().unwrap();

    let registry: Arc<Registry> = container.get("").unwrap();
    assert!(Arc::ptr_eq(&registry.plugin.registry, &registry));

    let mut container = lazy_container()
        .with_config(ContainerConfig::default().allow_circular_references(true));
    container.refresh().unwrap();
}

// ###############################################
// Lifecycle order

struct Step {
    name: &'static str,
    journal: Journal,
}

struct First {
    step: Step,
    second1: Inject<Arc<Second>>,
    second2: Inject<Arc<Second>>,
}
impl Bean for First {
    fn describe(bean: &mut BeanBuilder<'_, Self>) {
        bean.destroy(|first: &First| first.step.journal.lock().push("first".into()));
    }

    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.second1, "second1")?;
        ctx.autowire(&self.second2, "second2")
    }
}

struct Second {
    step: Step,
    third: Inject<Arc<Third>>,
}
impl Bean for Second {
    fn describe(bean: &mut BeanBuilder<'_, Self>) {
        bean.destroy(|second: &Second| {
            let name = second.step.name.to_string();
            second.step.journal.lock().push(name)
        });
    }

    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.autowire(&self.third, "")
    }
}

struct Third {
    step: Step,
}
impl Bean for Third {
    fn describe(bean: &mut BeanBuilder<'_, Self>) {
        bean.destroy(|third: &Third| third.step.journal.lock().push(third.step.name.into()));
    }
}

fn step(name: &'static str, journal: &Journal) -> Step {
    Step {
        name,
        journal: journal.clone(),
    }
}

#[tokio::test]
async fn destroy_runs_dependents_first() {
    let journal = journal();
    let mut container = Container::new();
    container
        .object(First {
            step: step("first", &journal),
            second1: Inject::new(),
            second2: Inject::new(),
        })
        .unwrap();
    for name in ["second1", "second2"] {
        container
            .object(Second {
                step: step(name, &journal),
                third: Inject::new(),
            })
            .unwrap()
            .name(name);
    }
    container
        .object(Third {
            step: step("third", &journal),
        })
        .unwrap();
    container.refresh().unwrap();
    container.close().await;
    container.close().await;

    let log = journal.lock().clone();
    let pos = |name: &str| log.iter().position(|entry| entry == name).unwrap();
    assert_eq!(log.len(), 4);
    assert!(pos("first") < pos("second1"));
    assert!(pos("first") < pos("second2"));
    assert!(pos("second1") < pos("third"));
    assert!(pos("second2") < pos("third"));
}

struct Later;
impl Bean for Later {}

#[test]
fn depends_on_wires_first() {
    let journal = journal();
    let mut container = Container::new();
    let log = journal.clone();
    container
        .object(Later)
        .unwrap()
        .depends_on(Selector::of::<Zero>())
        .init(move |_: &Later| log.lock().push("later".to_string()));
    let log = journal.clone();
    container
        .object(Zero { int: 0 })
        .unwrap()
        .init(move |_: &Zero| log.lock().push("zero".to_string()));
    container.refresh().unwrap();

    assert_eq!(*journal.lock(), vec!["zero", "later"]);
}

struct Failing;
impl Bean for Failing {}

#[test]
fn hook_and_constructor_errors_fail_the_refresh() {
    let mut container = Container::new();
    container
        .try_provide(|| Err::<Failing, _>("no connection"), args![])
        .unwrap();
    let err = container.refresh().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Construct);
    assert!(err.to_string().contains("no connection"));

    let mut container = Container::new();
    container
        .object(Failing)
        .unwrap()
        .init(|_: &Failing| Err::<(), _>("init failed"));
    let err = container.refresh().unwrap_err();
    assert!(matches!(err.root(), Error::Hook { hook: "init", .. }));
}

#[tokio::test]
async fn failing_destroy_hooks_do_not_stop_close() {
    let journal = journal();
    let mut container = Container::new();
    for name in ["d1", "d2"] {
        let log = journal.clone();
        container
            .object(Later)
            .unwrap()
            .name(name)
            .destroy(move |_: &Later| {
                log.lock().push(name.to_string());
                if name == "d1" {
                    Err("disk gone")
                } else {
                    Ok(())
                }
            });
    }
    container.refresh().unwrap();
    container.close().await;

    let mut log = journal.lock().clone();
    log.sort();
    assert_eq!(log, vec!["d1", "d2"]);
}

static SHARED_CALLS: AtomicUsize = AtomicUsize::new(0);

struct Shared;
impl Bean for Shared {}

struct UserA {
    _shared: Arc<Shared>,
}
impl Bean for UserA {}

struct UserB {
    _shared: Arc<Shared>,
}
impl Bean for UserB {}

#[test]
fn constructors_run_once() {
    let mut container = Container::new();
    container
        .provide(
            || {
                SHARED_CALLS.fetch_add(1, Ordering::SeqCst);
                Shared
            },
            args![],
        )
        .unwrap();
    container
        .provide(|shared: Arc<Shared>| UserA { _shared: shared }, args![])
        .unwrap();
    container
        .provide(|shared: Arc<Shared>| UserB { _shared: shared }, args![])
        .unwrap();
    container.refresh().unwrap();

    let first: Arc<Shared> = container.get("").unwrap();
    let second: Arc<Shared> = container.get("Shared").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(SHARED_CALLS.load(Ordering::SeqCst), 1);
}

#[test]
fn lookups_run_from_many_threads() {
    let mut container = Container::new();
    container.property("greeting", "hi").unwrap();
    container.object(Zero { int: 7 }).unwrap();
    graph(&mut container);
    container.refresh().unwrap();

    let expected: Arc<Two> = container.get("").unwrap();
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..100 {
                    let two: Arc<Two> = container.get("").unwrap();
                    assert!(Arc::ptr_eq(&two, &expected));
                    let greeting: String = container.get("${greeting}").unwrap();
                    assert_eq!(greeting, "hi");
                    assert_eq!(container.find("Zero").unwrap().len(), 1);
                }
            });
        }
    });
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 32, ..ProptestConfig::default() })]

    #[test]
    fn init_order_is_deterministic(names in prop::collection::hash_set("[a-z]{1,6}", 1..12)) {
        let journal = journal();
        let mut container = Container::new();
        for name in &names {
            let log = journal.clone();
            let name = name.clone();
            container
                .object(Later)
                .unwrap()
                .name(name.clone())
                .init(move |_: &Later| log.lock().push(name.clone()));
        }
        container.refresh().unwrap();

        let mut expected: Vec<String> = names.into_iter().collect();
        expected.sort();
        prop_assert_eq!(journal.lock().clone(), expected);
    }
}

// ###############################################
// Constructors, options and ad-hoc wiring

#[derive(Debug, PartialEq)]
enum Listen {
    Port(u16),
    Tls,
}

struct Http {
    options: Vec<Listen>,
    hosts: Vec<String>,
}
impl Bean for Http {}

fn http(options: Options<Listen>, hosts: Vec<String>) -> Http {
    Http {
        options: options.into_inner(),
        hosts,
    }
}

#[test]
fn option_groups_respect_conditions() {
    let mut container = Container::new();
    container.property("http.hosts", "a, b").unwrap();
    container
        .provide(
            http,
            args![
                Arg::options([
                    OptionArg::new(Listen::Port, args!["${http.port:=8080}"]),
                    OptionArg::new(|| Listen::Tls, args![]).on(on_property("http.tls")),
                ]),
                "${http.hosts}",
            ],
        )
        .unwrap();
    container.refresh().unwrap();

    let http: Arc<Http> = container.get("").unwrap();
    assert_eq!(http.options, vec![Listen::Port(8080)]);
    assert_eq!(http.hosts, vec!["a", "b"]);
}

#[test]
fn lookups_after_refresh() {
    let mut container = Container::new();
    container.property("greeting", "hi").unwrap();
    container.object(Zero { int: 3 }).unwrap();
    graph(&mut container);
    container.refresh().unwrap();

    let port: u16 = container.get("${port:=8080}").unwrap();
    assert_eq!(port, 8080);

    let sum = container
        .invoke(
            |two: Arc<Two>, greeting: String, extra: i32| {
                format!("{greeting} {}", two.one.zero.int + extra)
            },
            args!["", "${greeting}", Arg::value(2)],
        )
        .unwrap();
    assert_eq!(sum, "hi 5");

    let one = container.wire(One::default()).unwrap();
    assert_eq!(one.zero.int, 3);
    assert_eq!(container.find("One").unwrap().len(), 1);

    let two = container.wire_with(Two::default, args![]).unwrap();
    assert_eq!(two.one.zero.int, 3);

    let err = container.invoke(|_: Arc<Missing>| (), args![]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoSuchBean);
}

// ###############################################
// Tasks and context

#[derive(Default)]
struct Worker {
    ctx: Inject<Context>,
}
impl Bean for Worker {
    fn wire(&self, ctx: &mut Wiring<'_>) -> Result<(), Error> {
        ctx.context(&self.ctx)
    }
}

#[tokio::test]
async fn close_cancels_supervised_tasks() {
    let mut container = Container::new();
    container.object(Worker::default()).unwrap();
    container.refresh().unwrap();
    assert!(container.is_context_aware());

    let worker: Arc<Worker> = container.get("").unwrap();
    let stopped = Arc::new(AtomicBool::new(false));
    let flag = stopped.clone();
    worker
        .ctx
        .go(|token| async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(5)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();
    container.go(|_| async { panic!("task failed") }).unwrap();

    container.close().await;
    assert!(stopped.load(Ordering::SeqCst));
    assert!(worker.ctx.is_cancelled());
    let stats = container.task_stats();
    assert_eq!(stats.spawned, 2);
    assert_eq!(stats.panicked, 1);
    assert!(container.go(|_| async {}).is_err());
}
