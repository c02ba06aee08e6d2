use clap::ValueEnum;
use tracing::info;

use foundation::bounds::Viewport;
use protocol::{Payload, WorkerEvent};
use runtime::Compute;

/// Which result event the culler answers a viewport with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Report {
    /// One circle per visible box.
    #[default]
    Bubbles,
    /// Index pairs of visible boxes that overlap each other.
    Collisions,
    /// Indices of the visible boxes.
    Culled,
}

/// Stand-in for the real broadphase: works on the boxes that overlap the
/// viewport and are at least one pixel wide at the current zoom.
#[derive(Debug, Default)]
pub struct BoxCuller {
    report: Report,
    bounds: Vec<[f32; 4]>,
    winsize: [f32; 2],
}

impl BoxCuller {
    pub fn new(report: Report) -> Self {
        Self {
            report,
            ..Self::default()
        }
    }

    fn visible(&self, v: &Viewport) -> Vec<u32> {
        let min_extent = v.width() / self.winsize[0].max(1.0);
        self.bounds
            .iter()
            .enumerate()
            .filter(|(_, b)| b[2] - b[0] >= min_extent && v.intersects(**b))
            .map(|(i, _)| i as u32)
            .collect()
    }

    fn circles(&self, hits: &[u32]) -> Vec<f32> {
        hits.iter()
            .flat_map(|&i| {
                let b = self.bounds[i as usize];
                let r = 0.5 * (b[2] - b[0]).max(b[3] - b[1]);
                [0.5 * (b[0] + b[2]), 0.5 * (b[1] + b[3]), r]
            })
            .collect()
    }

    /// Sweep along x over the visible boxes.
    fn overlaps(&self, hits: &[u32]) -> Vec<[u32; 2]> {
        let x0 = |i: u32| self.bounds[i as usize][0];
        let mut order = hits.to_vec();
        order.sort_by(|&a, &b| x0(a).total_cmp(&x0(b)));
        let mut pairs = Vec::new();
        for (n, &i) in order.iter().enumerate() {
            let a = self.bounds[i as usize];
            for &j in &order[n + 1..] {
                let b = self.bounds[j as usize];
                if b[0] > a[2] {
                    break;
                }
                if b[1] <= a[3] && b[3] >= a[1] {
                    pairs.push([i.min(j), i.max(j)]);
                }
            }
        }
        pairs
    }
}

impl Compute for BoxCuller {
    fn handle(&mut self, payload: Payload) -> Option<WorkerEvent> {
        match payload {
            Payload::Winsize { width, height } => {
                self.winsize = [width, height];
                None
            }
            Payload::Data(bounds) => {
                info!(entities = bounds.len(), "dataset replaced");
                self.bounds = bounds;
                None
            }
            Payload::Monolith(blob) => {
                // No tree layout here; the blob is only acknowledged.
                info!(bytes = blob.len(), "monolith received");
                None
            }
            Payload::Viewport(v) => {
                let hits = self.visible(&v);
                Some(match self.report {
                    Report::Bubbles => WorkerEvent::bubbles(&self.circles(&hits)),
                    Report::Collisions => WorkerEvent::collisions(&self.overlaps(&hits)),
                    Report::Culled => WorkerEvent::culled(&hits),
                })
            }
        }
    }
}

/// Deterministic square grid of boxes anchored inside `±extent`, with sizes
/// that vary by index. Larger boxes spill into the next cell.
pub fn grid_boxes(count: u32, extent: f32) -> Vec<[f32; 4]> {
    if count == 0 {
        return Vec::new();
    }
    let side = (count as f32).sqrt().ceil() as u32;
    let cell = 2.0 * extent / side as f32;
    (0..count)
        .map(|i| {
            let (col, row) = (i % side, i / side);
            let x0 = -extent + col as f32 * cell;
            let y0 = -extent + row as f32 * cell;
            // Knuth multiplicative hash keeps sizes spread without an RNG.
            let t = (i.wrapping_mul(2_654_435_761) >> 16) as f32 / 65_535.0;
            let size = cell * (0.05 + 1.35 * t);
            [x0, y0, x0 + size, y0 + size]
        })
        .collect()
}
