use clap::Args;

use guide_core::{ApmTarget, Configuration, InstallMethod, OpenMetricsTarget, TargetList};

#[derive(Args)]
pub struct InitArgs {
    /// Install method to preselect (operator, helm, yaml)
    #[arg(long, default_value_t = InstallMethod::Operator)]
    pub method: InstallMethod,

    /// Number of APM targets to scaffold
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub apm_targets: u32,

    /// Number of OpenMetrics targets to scaffold
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub metrics_targets: u32,
}

pub fn execute(args: InitArgs) -> anyhow::Result<()> {
    let mut apm = TargetList::new(ApmTarget::sample());
    for _ in 1..args.apm_targets {
        apm.push_next(ApmTarget::numbered);
    }
    let mut metrics = TargetList::new(OpenMetricsTarget::sample());
    for _ in 1..args.metrics_targets {
        metrics.push_next(OpenMetricsTarget::numbered);
    }

    let config = Configuration {
        install_method: args.method,
        apm_targets: apm.into_vec(),
        open_metrics_targets: metrics.into_vec(),
        ..Configuration::default()
    };
    print!("{}", config.to_yaml()?);
    Ok(())
}
