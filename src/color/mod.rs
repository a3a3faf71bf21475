pub mod hsv;
pub mod kmeans;

use image::{DynamicImage, RgbImage};

use crate::config::PipelineConfig;
use crate::mask::VehicleMask;
use crate::models::{ColorCluster, ColorSpace};
use kmeans::KMeansParams;

/// Why the whole-image RGB path was taken
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No target-class detection, so there is no vehicle region
    NoVehicleRegion,
    /// Every masked pixel was too gray or too dark
    FilteredOut,
}

/// Which pixels were clustered, and in which color space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPath {
    MaskedHsv,
    WholeImageRgb(FallbackReason),
}

impl SelectionPath {
    pub fn space(&self) -> ColorSpace {
        match self {
            SelectionPath::MaskedHsv => ColorSpace::Hsv,
            SelectionPath::WholeImageRgb(_) => ColorSpace::Rgb,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DominantColors {
    pub path: SelectionPath,
    /// Pixels fed to clustering
    pub sampled: usize,
    pub clusters: Vec<ColorCluster>,
}

/// Clusters the colors of a vehicle region into a few representative colors
#[derive(Debug, Clone)]
pub struct ColorExtractor {
    pub cluster_count: usize,
    pub saturation_threshold: u8,
    pub value_threshold: u8,
    pub max_iterations: usize,
    pub seed: Option<u64>,
}

impl Default for ColorExtractor {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl ColorExtractor {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            cluster_count: config.cluster_count,
            saturation_threshold: config.saturation_threshold.min(255) as u8,
            value_threshold: config.value_threshold.min(255) as u8,
            max_iterations: config.max_iterations,
            seed: config.seed,
        }
    }

    pub fn with_cluster_count(mut self, cluster_count: usize) -> Self {
        self.cluster_count = cluster_count;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Masked pixels that survive the HSV gray/dark filter, as HSV.
    pub fn filtered_hsv(&self, rgb: &RgbImage, mask: &VehicleMask) -> Vec<[u8; 3]> {
        select_pixels(rgb, mask)
            .into_iter()
            .map(hsv::rgb_to_hsv)
            .filter(|[_, s, v]| *s > self.saturation_threshold && *v > self.value_threshold)
            .collect()
    }

    pub fn extract(&self, image: &DynamicImage, mask: &VehicleMask) -> DominantColors {
        let rgb = image.to_rgb8();

        let (path, pixels) = match mask {
            VehicleMask::Empty => (
                SelectionPath::WholeImageRgb(FallbackReason::NoVehicleRegion),
                whole_image(&rgb),
            ),
            VehicleMask::Region(_) => {
                let filtered = self.filtered_hsv(&rgb, mask);
                if filtered.is_empty() {
                    (
                        SelectionPath::WholeImageRgb(FallbackReason::FilteredOut),
                        whole_image(&rgb),
                    )
                } else {
                    (SelectionPath::MaskedHsv, filtered)
                }
            }
        };

        tracing::debug!(?path, pixels = pixels.len(), k = self.cluster_count, "clustering colors");

        let params = KMeansParams {
            k: self.cluster_count,
            max_iterations: self.max_iterations,
            seed: self.seed,
            ..Default::default()
        };
        let space = path.space();
        let clusters = kmeans::kmeans(&pixels, &params)
            .into_iter()
            .map(|cluster| ColorCluster {
                centroid: cluster.centroid.map(|c| c.round().clamp(0.0, 255.0) as u8),
                space,
                member_count: cluster.members,
            })
            .collect();

        DominantColors {
            path,
            sampled: pixels.len(),
            clusters,
        }
    }
}

/// Pixels covered by the mask; the whole image when the mask is `Empty`.
pub fn select_pixels(rgb: &RgbImage, mask: &VehicleMask) -> Vec<[u8; 3]> {
    match mask {
        VehicleMask::Empty => whole_image(rgb),
        VehicleMask::Region(region) => rgb
            .enumerate_pixels()
            .filter(|(x, y, _)| region.get_pixel_checked(*x, *y).is_some_and(|m| m[0] != 0))
            .map(|(_, _, p)| p.0)
            .collect(),
    }
}

fn whole_image(rgb: &RgbImage) -> Vec<[u8; 3]> {
    rgb.pixels().map(|p| p.0).collect()
}
