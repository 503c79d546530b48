//! Control-plane region resolution.

use std::fmt;

/// The region used whenever a requested region is absent or unknown.
pub const DEFAULT_REGION: &str = "us-east-1";

/// The known control-plane regions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    AwsUsEast1,
    AwsUsWest1,
    AwsUsWest2,
    AwsEuWest1,
    AwsEuCentral1,
    AwsApSoutheast1,
    AwsApSoutheast2,
    AwsApNortheast1,
    AwsSaEast1,
    GcpUsCentral1,
    GcpUsWest1,
    GcpEuropeWest1,
    GcpEuropeWest3,
    GcpAsiaNortheast1,
    AzureEastUs2,
    AzureWestUs2,
    AzureWestEurope,
    AzureJapanEast,
}

impl Region {
    pub const ALL: [Region; 18] = [
        Region::AwsUsEast1,
        Region::AwsUsWest1,
        Region::AwsUsWest2,
        Region::AwsEuWest1,
        Region::AwsEuCentral1,
        Region::AwsApSoutheast1,
        Region::AwsApSoutheast2,
        Region::AwsApNortheast1,
        Region::AwsSaEast1,
        Region::GcpUsCentral1,
        Region::GcpUsWest1,
        Region::GcpEuropeWest1,
        Region::GcpEuropeWest3,
        Region::GcpAsiaNortheast1,
        Region::AzureEastUs2,
        Region::AzureWestUs2,
        Region::AzureWestEurope,
        Region::AzureJapanEast,
    ];

    /// The control plane's identifier of this region.
    pub fn id(self) -> &'static str {
        match self {
            Region::AwsUsEast1 => "us-east-1",
            Region::AwsUsWest1 => "us-west-1",
            Region::AwsUsWest2 => "us-west-2",
            Region::AwsEuWest1 => "eu-west-1",
            Region::AwsEuCentral1 => "eu-central-1",
            Region::AwsApSoutheast1 => "ap-southeast-1",
            Region::AwsApSoutheast2 => "ap-southeast-2",
            Region::AwsApNortheast1 => "ap-northeast-1",
            Region::AwsSaEast1 => "sa-east-1",
            Region::GcpUsCentral1 => "gcp-us-central-1",
            Region::GcpUsWest1 => "gcp-us-west-1",
            Region::GcpEuropeWest1 => "gcp-europe-west-1",
            Region::GcpEuropeWest3 => "gcp-europe-west-3",
            Region::GcpAsiaNortheast1 => "gcp-asia-northeast-1",
            Region::AzureEastUs2 => "azure-eastus2",
            Region::AzureWestUs2 => "azure-westus2",
            Region::AzureWestEurope => "azure-westeurope",
            Region::AzureJapanEast => "azure-japaneast",
        }
    }

    /// The URL path segment which scopes API calls to this region.
    pub fn path(self) -> String {
        format!("/v1-regions/{}", self.id())
    }

    /// Look up the given region, falling back to the default region when absent or unknown.
    pub fn resolve(requested: Option<&str>) -> Region {
        requested
            .map(str::trim)
            .and_then(|requested| Region::ALL.iter().copied().find(|region| region.id() == requested))
            .unwrap_or_default()
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::AwsUsEast1
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Resolve the region path segment of the requested region.
///
/// This never fails: unknown or absent regions resolve to the default region's path.
pub fn resolve_region_path(requested: Option<&str>) -> String {
    let region = Region::resolve(requested);
    if requested.map(|req| req.trim() != region.id()).unwrap_or(false) {
        tracing::debug!(requested = ?requested, region = %region, "unknown region requested, using default region");
    }
    region.path()
}
