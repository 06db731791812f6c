mod dispatch_retry_worker;

pub use dispatch_retry_worker::DispatchRetryWorker;
