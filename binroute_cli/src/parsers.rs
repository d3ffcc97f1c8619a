use binroute_matrix_providers::travel_matrix_provider::TravelMatrixProvider;
use binroute_optimizer::solver::solver_params::Threads;
use clap::ValueEnum;
use jiff::SpanRelativeTo;

pub fn parse_duration(input: &str) -> Result<jiff::SignedDuration, String> {
    if let Ok(duration) = input.parse::<jiff::SignedDuration>() {
        return Ok(duration);
    }

    if let Ok(duration) = input
        .parse::<jiff::Span>()
        .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
    {
        return Ok(duration);
    }

    if let Ok(seconds) = input.parse::<i64>() {
        return Ok(jiff::SignedDuration::from_secs(seconds.abs()));
    }

    Err(String::from("Invalid duration"))
}

/// `0` uses every available core.
pub fn threads(count: u8) -> Threads {
    match count {
        0 => Threads::Auto,
        1 => Threads::Single,
        n => Threads::Multi(n as usize),
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderArg {
    Geodesic,
    DistanceMatrixApi,
}

impl From<ProviderArg> for TravelMatrixProvider {
    fn from(value: ProviderArg) -> Self {
        match value {
            ProviderArg::Geodesic => TravelMatrixProvider::Geodesic,
            ProviderArg::DistanceMatrixApi => TravelMatrixProvider::DistanceMatrixApi { region: None },
        }
    }
}
