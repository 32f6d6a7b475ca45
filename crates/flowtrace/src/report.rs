use flowtrace_core::FlowRegistry;
use itertools::Itertools;

/// Print the hops recorded for every traced flow.
///
/// One line per probed time-to-live, with every responder observed at that
/// distance in reception order.
pub fn print(registry: &FlowRegistry) {
    let flows = registry.snapshot();
    if flows.is_empty() {
        println!("no flows were traced");
        return;
    }
    for (key, report) in flows {
        println!("flow {key}");
        if report.is_empty() {
            println!("  no hops responded");
            continue;
        }
        for (ttl, responders) in report {
            println!("  {:>3}  {}", ttl, responders.iter().format(", "));
        }
    }
}
