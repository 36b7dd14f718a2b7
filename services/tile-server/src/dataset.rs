//! Dataset manifests: which views exist, where their voxels come from and how
//! they are displayed.
//!
//! A manifest is YAML:
//!
//! ```yaml
//! name: embryo
//! timepoints: 2
//! setups:
//!   - id: 0
//!     label: angle 0
//!     registration: [1, 0, 0, 0,  0, 1, 0, 0,  0, 0, 2.5, 0]
//!     levels: 4
//!     display: { min: 90, max: 4000, color: "#00FF00" }
//!     volume:
//!       kind: raw
//!       path: "t{t}/setup{s}.raw"
//!       dims: [512, 512, 120]
//!       sample_type: u16
//!   - id: 1
//!     label: angle 1
//!     volume: { kind: phantom, dims: [128, 128, 64], seed: 7 }
//! visible: [0, 1]
//! ```
//!
//! Raw files hold headerless little-endian samples, x fastest. `{t}` and `{s}`
//! in the path are replaced by the timepoint and setup id; relative paths are
//! resolved against the manifest's directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use renderer::{
    Converter, DisplayMode, LinearRangeConverter, Source, SourceAndConverter, ViewerState, Volume,
    VolumePyramid, Voxel,
};
use serde::Deserialize;
use tile_common::{Affine3D, SequenceDescription, ViewSetup};
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetManifest {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_timepoints")]
    pub timepoints: usize,
    pub setups: Vec<SetupManifest>,
    /// Setup ids shown initially. All when absent.
    #[serde(default)]
    pub visible: Option<Vec<usize>>,
    /// Show only this setup, whatever `visible` says.
    #[serde(default)]
    pub single_setup: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetupManifest {
    pub id: usize,
    #[serde(default)]
    pub label: Option<String>,
    /// Level-0 voxel to world, 12 row-major numbers.
    #[serde(default)]
    pub registration: Option<Affine3D>,
    #[serde(default = "default_levels")]
    pub levels: usize,
    #[serde(default)]
    pub display: DisplayManifest,
    /// Timepoints this view was acquired at. All when absent.
    #[serde(default)]
    pub timepoints: Option<Vec<usize>>,
    pub volume: VolumeManifest,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayManifest {
    #[serde(default)]
    pub min: f64,
    #[serde(default = "default_display_max")]
    pub max: f64,
    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for DisplayManifest {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: default_display_max(),
            color: default_color(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleType {
    U8,
    U16,
    F32,
}

impl SampleType {
    pub fn size(&self) -> usize {
        match self {
            SampleType::U8 => 1,
            SampleType::U16 => 2,
            SampleType::F32 => 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VolumeManifest {
    Raw {
        path: String,
        dims: [usize; 3],
        sample_type: SampleType,
    },
    Phantom {
        dims: [usize; 3],
        #[serde(default)]
        seed: u64,
    },
}

fn default_name() -> String {
    "dataset".to_string()
}

fn default_timepoints() -> usize {
    1
}

fn default_levels() -> usize {
    1
}

fn default_display_max() -> f64 {
    6000.0
}

fn default_color() -> String {
    "#FFFFFF".to_string()
}

/// Parse `#RRGGBB` (or `RRGGBB`) into `0xRRGGBB`.
pub fn parse_color(value: &str) -> Result<u32> {
    let hex = value.trim().trim_start_matches('#');
    ensure!(hex.len() == 6, "color '{value}' is not #RRGGBB");
    u32::from_str_radix(hex, 16).with_context(|| format!("color '{value}' is not #RRGGBB"))
}

/// Everything the server renders from: the sequence description plus one
/// source/converter pair per setup.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub sequence: SequenceDescription,
    pub sources: Vec<SourceAndConverter>,
    /// Indices into `sources` shown initially.
    pub visible: Vec<usize>,
    /// Index into `sources` displayed alone, if any.
    pub single: Option<usize>,
}

impl Dataset {
    /// Load a manifest file and every volume it references.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read dataset manifest {}", path.display()))?;
        let manifest: DatasetManifest = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse dataset manifest {}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_manifest(&manifest, base_dir)
    }

    pub fn from_manifest(manifest: &DatasetManifest, base_dir: &Path) -> Result<Self> {
        ensure!(!manifest.setups.is_empty(), "dataset '{}' has no setups", manifest.name);
        let num_timepoints = manifest.timepoints.max(1);

        let mut setups = Vec::with_capacity(manifest.setups.len());
        let mut sources = Vec::with_capacity(manifest.setups.len());
        for setup in &manifest.setups {
            if setups.iter().any(|s: &ViewSetup| s.id == setup.id) {
                bail!("setup id {} appears twice", setup.id);
            }
            let view = ViewSetup::new(
                setup.id,
                setup.label.clone().unwrap_or_else(|| format!("setup {}", setup.id)),
            );
            let source = load_setup(setup, num_timepoints, base_dir)
                .with_context(|| format!("failed to load setup {}", setup.id))?;
            let color = parse_color(&setup.display.color)?;
            let converter: Arc<dyn Converter> = Arc::new(
                LinearRangeConverter::new(setup.display.min, setup.display.max).with_color(color),
            );
            sources.push(SourceAndConverter::new(view.clone(), source, converter));
            setups.push(view);
        }

        let index_of = |id: usize, role: &str| {
            setups
                .iter()
                .position(|s: &ViewSetup| s.id == id)
                .with_context(|| format!("{role} setup {id} is not defined"))
        };
        let visible = match &manifest.visible {
            None => (0..sources.len()).collect(),
            Some(ids) => ids
                .iter()
                .map(|&id| index_of(id, "visible"))
                .collect::<Result<Vec<_>>>()?,
        };
        let single = manifest
            .single_setup
            .map(|id| index_of(id, "single"))
            .transpose()?;

        info!(
            dataset = %manifest.name,
            setups = setups.len(),
            timepoints = num_timepoints,
            "Loaded dataset"
        );

        Ok(Self {
            name: manifest.name.clone(),
            sequence: SequenceDescription::new(setups, num_timepoints),
            sources,
            visible,
            single,
        })
    }

    /// Synthetic three-view dataset used when no manifest is configured.
    pub fn demo() -> Result<Self> {
        let setup = |id: usize, color: &str, registration: Affine3D| SetupManifest {
            id,
            label: Some(format!("demo angle {id}")),
            registration: Some(registration),
            levels: 4,
            display: DisplayManifest {
                min: 0.0,
                max: 4000.0,
                color: color.to_string(),
            },
            timepoints: None,
            volume: VolumeManifest::Phantom {
                dims: [128, 128, 48],
                seed: id as u64 + 1,
            },
        };
        let manifest = DatasetManifest {
            name: "demo".to_string(),
            timepoints: 2,
            setups: vec![
                setup(0, "#FF00FF", Affine3D::scaling(1.0, 1.0, 2.0)),
                setup(1, "#00FF00", Affine3D::from_row_major([
                    0.0, 0.0, 2.0, 0.0, //
                    0.0, 1.0, 0.0, 0.0, //
                    1.0, 0.0, 0.0, 0.0,
                ])),
                setup(2, "#FFFF00", Affine3D::translation(4.0, -3.0, 0.0)
                    .concatenate(&Affine3D::scaling(1.0, 1.0, 2.0))),
            ],
            visible: None,
            single_setup: None,
        };
        Self::from_manifest(&manifest, Path::new("."))
    }

    /// A fresh viewer state over this dataset with the initial visibility.
    pub fn viewer_state(&self) -> ViewerState {
        let mut state = ViewerState::new(self.sources.clone(), self.sequence.num_timepoints());
        for i in 0..self.sources.len() {
            state.set_visible(i, self.visible.contains(&i));
        }
        if let Some(index) = self.single {
            state.set_current_source(index);
            state.set_display_mode(DisplayMode::Single);
        }
        state
    }
}

fn load_setup(setup: &SetupManifest, num_timepoints: usize, base_dir: &Path) -> Result<Arc<dyn Source>> {
    let name = setup.label.clone().unwrap_or_else(|| format!("setup {}", setup.id));
    let registration = setup.registration.unwrap_or_else(Affine3D::identity);
    ensure!(
        registration.inverse().is_some(),
        "registration of setup {} is not invertible",
        setup.id
    );
    let dims = match &setup.volume {
        VolumeManifest::Raw { dims, .. } | VolumeManifest::Phantom { dims, .. } => *dims,
    };
    ensure!(
        dims.iter().all(|&d| d > 0),
        "volume dimensions {:?} of setup {} must all be positive",
        dims,
        setup.id
    );
    let acquired = |t: usize| setup.timepoints.as_ref().map_or(true, |ts| ts.contains(&t));

    let source: Arc<dyn Source> = match &setup.volume {
        VolumeManifest::Raw {
            path,
            dims,
            sample_type,
        } => {
            let file = |t: usize| resolve_path(base_dir, path, t, setup.id);
            match sample_type {
                SampleType::U8 => Arc::new(build_pyramid::<u8>(
                    name,
                    registration,
                    setup.levels,
                    num_timepoints,
                    &acquired,
                    |t| read_raw(&file(t), *dims, *sample_type, |b| b[0]),
                )?),
                SampleType::U16 => Arc::new(build_pyramid::<u16>(
                    name,
                    registration,
                    setup.levels,
                    num_timepoints,
                    &acquired,
                    |t| read_raw(&file(t), *dims, *sample_type, |b| u16::from_le_bytes([b[0], b[1]])),
                )?),
                SampleType::F32 => Arc::new(build_pyramid::<f32>(
                    name,
                    registration,
                    setup.levels,
                    num_timepoints,
                    &acquired,
                    |t| {
                        read_raw(&file(t), *dims, *sample_type, |b| {
                            f32::from_le_bytes([b[0], b[1], b[2], b[3]])
                        })
                    },
                )?),
            }
        }
        VolumeManifest::Phantom { dims, seed } => Arc::new(build_pyramid::<u16>(
            name,
            registration,
            setup.levels,
            num_timepoints,
            &acquired,
            |t| Ok(phantom_volume(*dims, seed.wrapping_add(t as u64))),
        )?),
    };
    Ok(source)
}

fn build_pyramid<T: Voxel>(
    name: String,
    registration: Affine3D,
    levels: usize,
    num_timepoints: usize,
    acquired: &dyn Fn(usize) -> bool,
    mut load: impl FnMut(usize) -> Result<Volume<T>>,
) -> Result<VolumePyramid<T>> {
    let mut volumes = Vec::with_capacity(num_timepoints);
    for t in 0..num_timepoints {
        volumes.push(if acquired(t) { Some(load(t)?) } else { None });
    }
    Ok(VolumePyramid::build(name, registration, volumes, levels))
}

fn resolve_path(base_dir: &Path, template: &str, timepoint: usize, setup: usize) -> PathBuf {
    let path = PathBuf::from(
        template
            .replace("{t}", &timepoint.to_string())
            .replace("{s}", &setup.to_string()),
    );
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}

/// Read a headerless little-endian volume.
pub fn read_raw<T: Voxel>(
    path: &Path,
    dims: [usize; 3],
    sample_type: SampleType,
    decode: impl Fn(&[u8]) -> T,
) -> Result<Volume<T>> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let expected = dims.iter().product::<usize>() * sample_type.size();
    ensure!(
        bytes.len() == expected,
        "{} has {} bytes, dimensions {:?} of {:?} need {}",
        path.display(),
        bytes.len(),
        dims,
        sample_type,
        expected
    );
    let samples = bytes.chunks_exact(sample_type.size()).map(decode).collect();
    debug!(path = %path.display(), ?dims, "Read raw volume");
    Ok(Volume::new(dims, samples)?)
}

/// Synthetic specimen: a dim ellipsoid body with a few bright nuclei and
/// faint noise, reproducible from `seed`.
pub fn phantom_volume(dims: [usize; 3], seed: u64) -> Volume<u16> {
    let mut rng = StdRng::seed_from_u64(seed);
    let extent = dims.map(|d| d.max(1) as f64);
    let center = extent.map(|e| (e - 1.0) / 2.0);

    let nuclei: Vec<([f64; 3], f64, f64)> = (0..12)
        .map(|_| {
            let position = [0, 1, 2].map(|i| center[i] + rng.gen_range(-0.3..0.3) * extent[i]);
            let radius = rng.gen_range(0.04..0.1) * extent[0].min(extent[1]);
            let brightness = rng.gen_range(1500.0..3500.0);
            (position, radius, brightness)
        })
        .collect();
    let noise_seed: u64 = rng.gen();

    let mut noise = StdRng::seed_from_u64(noise_seed);
    Volume::from_fn(dims, |x, y, z| {
        let p = [x as f64, y as f64, z as f64];
        let body: f64 = (0..3)
            .map(|i| ((p[i] - center[i]) / (0.45 * extent[i])).powi(2))
            .sum();
        let mut value = if body <= 1.0 { 400.0 } else { 0.0 };
        for (position, radius, brightness) in &nuclei {
            let d2: f64 = (0..3).map(|i| (p[i] - position[i]).powi(2)).sum();
            if d2 <= radius * radius {
                value += brightness;
            }
        }
        value += noise.gen_range(0.0..60.0);
        value.min(u16::MAX as f64) as u16
    })
}
