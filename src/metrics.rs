use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("inspiration_requests_total", "Total number of generate requests")
            .expect("register inspiration_requests_total");
    pub static ref QUOTA_REJECTIONS: Counter = register_counter!(
        "inspiration_quota_rejections_total",
        "Requests rejected because the client quota was used up"
    )
    .expect("register inspiration_quota_rejections_total");
    pub static ref GENERATION_FAILURES: Counter = register_counter!(
        "inspiration_generation_failures_total",
        "Requests that failed while calling the generation API"
    )
    .expect("register inspiration_generation_failures_total");
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "inspiration_request_latency_seconds",
        "Generation API round trip in seconds"
    )
    .expect("register inspiration_request_latency_seconds");
    pub static ref TRACKED_CLIENTS: Gauge =
        register_gauge!("inspiration_tracked_clients", "Clients currently held in the quota table")
            .expect("register inspiration_tracked_clients");
}
