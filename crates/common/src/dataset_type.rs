//! Reality-data dataset types as named by the dataset service.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Type of a reality-data dataset.
///
/// Known types map one-to-one to the service's type strings; anything else
/// is carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatasetType {
    /// Collection of photos.
    CCImageCollection,
    /// Camera orientations (`BlocksExchange` XML).
    CCOrientations,
    /// Context scene (XML or JSON).
    ContextScene,
    /// Trained detector.
    ContextDetector,
    /// Orbit point cloud.
    OPC,
    /// Point cloud tiles.
    PNTS,
    /// Cesium 3D tiles.
    Cesium3DTiles,
    /// 3MX mesh.
    ThreeMX,
    /// 3SM mesh.
    ThreeSM,
    /// LAS point cloud.
    LAS,
    /// LAZ point cloud.
    LAZ,
    /// PLY point cloud or mesh.
    PLY,
    /// E57 point cloud.
    E57,
    /// OBJ mesh.
    OBJ,
    /// Generic point cloud.
    PointCloud,
    /// Any type not listed above.
    Other(String),
}

impl DatasetType {
    /// Type string used by the dataset service.
    pub fn as_str(&self) -> &str {
        match self {
            DatasetType::CCImageCollection => "CCImageCollection",
            DatasetType::CCOrientations => "CCOrientations",
            DatasetType::ContextScene => "ContextScene",
            DatasetType::ContextDetector => "ContextDetector",
            DatasetType::OPC => "OPC",
            DatasetType::PNTS => "PNTS",
            DatasetType::Cesium3DTiles => "Cesium3DTiles",
            DatasetType::ThreeMX => "3MX",
            DatasetType::ThreeSM => "3SM",
            DatasetType::LAS => "LAS",
            DatasetType::LAZ => "LAZ",
            DatasetType::PLY => "PLY",
            DatasetType::E57 => "E57",
            DatasetType::OBJ => "OBJ",
            DatasetType::PointCloud => "PointCloud",
            DatasetType::Other(name) => name,
        }
    }

    /// Whether datasets of this type embed references to other datasets.
    pub fn carries_references(&self) -> bool {
        matches!(self, DatasetType::ContextScene | DatasetType::CCOrientations)
    }
}

impl FromStr for DatasetType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "CCImageCollection" => DatasetType::CCImageCollection,
            "CCOrientations" => DatasetType::CCOrientations,
            "ContextScene" => DatasetType::ContextScene,
            "ContextDetector" => DatasetType::ContextDetector,
            "OPC" => DatasetType::OPC,
            "PNTS" => DatasetType::PNTS,
            "Cesium3DTiles" => DatasetType::Cesium3DTiles,
            "3MX" => DatasetType::ThreeMX,
            "3SM" => DatasetType::ThreeSM,
            "LAS" => DatasetType::LAS,
            "LAZ" => DatasetType::LAZ,
            "PLY" => DatasetType::PLY,
            "E57" => DatasetType::E57,
            "OBJ" => DatasetType::OBJ,
            "PointCloud" => DatasetType::PointCloud,
            other => DatasetType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for DatasetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
