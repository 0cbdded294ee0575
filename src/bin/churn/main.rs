// Third Party
use clap::Parser;

// Local
use kube_churn::{
    utils::{create_client, init_tracing, setup_exit_hooks},
    Driver, Opts, StatusReporter,
};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_tracing("kube_churn", tracing::Level::INFO);
    let opts = Opts::parse();
    let client = create_client(opts.kubeconfig.as_deref(), opts.request_timeout()).await?;
    let driver = Driver::new(&client, opts.concurrency as usize, opts.list_limit);
    setup_exit_hooks(driver.counters())?;

    let reporter = StatusReporter::spawn(driver.counters(), opts.status_interval());
    let result = driver
        .run(opts.action, opts.resource_type, &opts.batch())
        .await;
    reporter.stop();
    result
}
