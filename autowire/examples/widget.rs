//! Planning and wiring a derived component.
//!
//! Run with `AUTOWIRE_ENVIRONMENT=Development` to also register the
//! development-only audit log.

use std::sync::Arc;

use autowire::Component;
use autowire::environment;
use autowire::prelude::*;

// === Define your traits and types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

trait Connection: Send + Sync {
    fn query(&self, sql: &str) -> String;
}

struct Postgres {
    url: &'static str,
}

impl Connection for Postgres {
    fn query(&self, sql: &str) -> String {
        format!("{sql} -> rows from {}", self.url)
    }
}

#[derive(Clone, Default)]
pub struct Settings {
    pub page_size: u32,
}

fn primary_db() -> impl DependencyResolver {
    Constant::new(Arc::new(Postgres {
        url: "postgres://localhost/app",
    }) as Arc<dyn Connection>)
}

fn tuned() -> impl DependencyResolver {
    Constant::new(Settings { page_size: 50 })
}

#[derive(Component)]
#[component(
    register(lifetime = "transient"),
    register(lifetime = "scoped", name = "request")
)]
struct Widget {
    log: Arc<dyn Logger>,
    #[resolve(primary_db())]
    conn: Arc<dyn Connection>,
    #[property]
    #[resolve(tuned())]
    pub settings: Settings,
}

impl Widget {
    fn render(&self) -> String {
        self.log.log("Rendering widget");
        self.conn
            .query(&format!("SELECT * FROM items LIMIT {}", self.settings.page_size))
    }
}

#[derive(Component)]
#[component(register(lifetime = "singleton"), environment(enabled = "Development"))]
struct AuditLog;

fn main() -> autowire::Result<()> {
    // Initialize tracing (logging)
    tracing_subscriber::fmt()
        .with_env_filter("autowire_container=debug")
        .init();

    let environment = environment::current();
    println!("Environment: {environment}");

    // Inspect the compiled plan
    let registrations = RegistrationPlanner::new(Catalog).plan(&TypeKey::of::<Widget>(), &environment)?;
    if let Some(factory) = registrations.first().and_then(ServiceRegistration::factory) {
        println!("{}", factory.render());
    }

    // Build the container from everything the catalog knows
    let container = ServiceCollection::new()
        .factory::<Arc<dyn Logger>>(Lifetime::Singleton, |_| {
            Ok(Arc::new(ConsoleLogger) as Arc<dyn Logger>)
        })
        .scan(&environment)
        .build()?;

    println!("{container:?}");
    for descriptor in container.descriptors() {
        println!("  {} ({})", descriptor.service, descriptor.lifetime);
    }

    let widget: Widget = container.get()?;
    println!("{}", widget.render());

    let scoped: Widget = container.get_named("request")?;
    println!("{}", scoped.render());

    tracing::info!(audit = container.contains(&TypeKey::of::<AuditLog>()), "Done");
    Ok(())
}
