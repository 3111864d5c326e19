// loader.rs — background decoding of panoramas and floor plans

use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbaImage};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadTarget {
    Panorama { scene_id: String, generation: u64 },
    FloorPlan { url: String },
}

#[derive(Debug)]
pub struct Loaded {
    pub target: LoadTarget,
    pub result: Result<RgbaImage, LoadError>,
}

/// Map a catalog reference such as `/panos/a.jpg` onto the assets root.
pub fn resolve_asset(root: &Path, url: &str) -> PathBuf {
    root.join(url.trim_start_matches('/'))
}

pub fn decode_image(path: &Path) -> Result<RgbaImage, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.display().to_string(),
        source,
    })?;
    let reader = BufReader::new(file);

    let img = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(image::ImageError::IoError)
        .and_then(|mut r| {
            r.no_limits();
            r.decode()
        })
        .map_err(|source| LoadError::Decode {
            path: path.display().to_string(),
            source,
        })?;

    let (w, h) = img.dimensions();
    log::info!("decoded {} ({}x{})", path.display(), w, h);
    Ok(img.to_rgba8())
}

/// Spawns one decoding thread per request and hands results back over a
/// channel polled by the event loop.
///
/// Panorama requests are numbered; only the newest one is current. Older
/// threads skip their work if they notice in time, and anything stale that
/// still arrives is dropped in [`ImageLoader::try_recv`].
pub struct ImageLoader {
    root: PathBuf,
    tx: Sender<Loaded>,
    rx: Receiver<Loaded>,
    generation: Arc<AtomicU64>,
}

impl ImageLoader {
    pub fn new(root: PathBuf) -> Self {
        let (tx, rx) = channel();
        Self {
            root,
            tx,
            rx,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn request_panorama(&self, scene_id: &str, url: &str) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let current = Arc::clone(&self.generation);
        let path = resolve_asset(&self.root, url);
        let tx = self.tx.clone();
        let target = LoadTarget::Panorama {
            scene_id: scene_id.to_string(),
            generation,
        };

        log::info!("loading panorama for {} from {:?}", scene_id, path);
        thread::spawn(move || {
            let is_current = || current.load(Ordering::SeqCst) == generation;
            if !is_current() {
                return;
            }
            let result = decode_image(&path);
            if is_current() && tx.send(Loaded { target, result }).is_err() {
                log::warn!("event loop gone, dropping decoded panorama");
            }
        });
        generation
    }

    pub fn request_floor_plan(&self, url: &str) {
        let path = resolve_asset(&self.root, url);
        let tx = self.tx.clone();
        let target = LoadTarget::FloorPlan {
            url: url.to_string(),
        };

        log::info!("loading floor plan {:?}", path);
        thread::spawn(move || {
            let result = decode_image(&path);
            if tx.send(Loaded { target, result }).is_err() {
                log::warn!("event loop gone, dropping decoded floor plan");
            }
        });
    }

    /// Next finished load, skipping superseded panoramas.
    pub fn try_recv(&self) -> Option<Loaded> {
        while let Ok(loaded) = self.rx.try_recv() {
            match &loaded.target {
                LoadTarget::Panorama { generation, scene_id }
                    if *generation != self.generation.load(Ordering::SeqCst) =>
                {
                    log::debug!("dropping stale panorama for {}", scene_id);
                }
                _ => return Some(loaded),
            }
        }
        None
    }
}
