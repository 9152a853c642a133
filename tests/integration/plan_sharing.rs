//! Plan Sharing Tests
//!
//! One plan cache serving many commands, connections and threads.

use std::sync::{Arc, Barrier};
use std::thread;

use crate::common::*;
use quarry::{Command, DefinitionCache, Parameter, PlanCache, QuarryConfig};

// ============================================================================
// Across Threads
// ============================================================================

#[test]
fn racing_prepares_converge_on_one_entry() {
    const THREADS: usize = 12;
    let env = TestEnv::new();
    let connection = Arc::clone(&env.connection);
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let connection = Arc::clone(&connection);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let cmd = Command::with_connection(
                    "SELECT VALUE c FROM Customers AS c WHERE c.Id = @id",
                    connection,
                );
                cmd.add_parameter(Parameter::new("id", 1i32)).unwrap();
                barrier.wait();
                cmd.prepare().unwrap();
                cmd.to_trace_string().unwrap()
            })
        })
        .collect();

    let traces: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(traces.windows(2).all(|w| w[0] == w[1]));

    let stats = env.connection.plan_cache().stats();
    assert_eq!(stats.size, 1);
    assert_eq!(stats.inserts, 1);
    assert_eq!(stats.hits + stats.misses, THREADS as u64);
    assert_eq!(env.provider.compile_count() as u64, stats.misses);
    assert_eq!(stats.adoptions, stats.misses - 1);
}

#[test]
fn concurrent_distinct_statements_stay_within_capacity() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 20;
    let mut config = QuarryConfig::default();
    config.plan_cache.capacity = 16;
    let env = TestEnv::builder().config(config).open();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let connection = Arc::clone(&env.connection);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    let text = format!("SELECT {} + {}", t, i);
                    let cmd = Command::with_connection(text, Arc::clone(&connection));
                    cmd.execute_non_query().unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let cache = env.connection.plan_cache();
    let stats = cache.stats();
    assert!(cache.len() <= 16);
    assert_eq!(stats.inserts, (THREADS * PER_THREAD) as u64);
    assert_eq!(stats.evictions, stats.inserts - cache.len() as u64);
    assert_eq!(env.provider.log().len(), THREADS * PER_THREAD);
}

// ============================================================================
// Across Connections
// ============================================================================

#[test]
fn injected_cache_shared_between_connections() {
    let cache: Arc<DefinitionCache> = Arc::new(PlanCache::new(64));
    let first = TestEnv::builder().cache(Arc::clone(&cache)).open();
    let second = TestEnv::builder().cache(Arc::clone(&cache)).open();

    first.command("SELECT 1").prepare().unwrap();
    second.command("SELECT 1").prepare().unwrap();

    // Same provider name and mapping: the second connection reuses the entry
    // without compiling the text at all.
    assert_eq!(first.provider.compile_count(), 1);
    assert_eq!(second.provider.compile_count(), 0);
    assert_eq!(second.compiler.compile_count(), 0);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn providers_never_share_definitions() {
    let cache: Arc<DefinitionCache> = Arc::new(PlanCache::new(64));
    let sql = TestEnv::builder()
        .provider_name("sql")
        .cache(Arc::clone(&cache))
        .open();
    let lite = TestEnv::builder()
        .provider_name("lite")
        .cache(Arc::clone(&cache))
        .open();

    sql.command("SELECT 1").prepare().unwrap();
    lite.command("SELECT 1").prepare().unwrap();

    assert_eq!(sql.provider.compile_count(), 1);
    assert_eq!(lite.provider.compile_count(), 1);
    assert_eq!(cache.len(), 2);
}

#[test]
fn private_caches_are_independent() {
    let a = TestEnv::new();
    let b = TestEnv::new();
    a.command("SELECT 1").prepare().unwrap();
    b.command("SELECT 1").prepare().unwrap();

    assert!(!Arc::ptr_eq(a.connection.plan_cache(), b.connection.plan_cache()));
    assert_eq!(a.provider.compile_count(), 1);
    assert_eq!(b.provider.compile_count(), 1);
}
