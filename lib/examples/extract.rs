use anyhow::{Context, Result};
use semantris_solver::{block_colors, extract_block, Marker};

/// Save the word areas found in a screenshot as `region-<n>.png`.
///
/// With a marker template the arcade extraction is used, otherwise the blocks one.
fn run() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .expect("Usage: extract SCREENSHOT [TEMPLATE]");
    let frame = image::open(&path)
        .with_context(|| format!("Failed to open {}", path))?
        .into_rgb8();
    eprintln!("read image from {}", path);

    let regions = match std::env::args().nth(2) {
        Some(template) => Marker::open(&template)?.regions(&frame),
        None => {
            let colors = block_colors(&frame);
            for c in colors.iter() {
                eprintln!("  block color {:?} covers {:.3}", c.color, c.fraction);
            }
            colors
                .iter()
                .filter_map(|c| extract_block(&frame, c.color))
                .collect()
        }
    };
    for (i, region) in regions.iter().enumerate() {
        region.save(format!("region-{}.png", i))?;
    }
    eprintln!("saved {} regions", regions.len());
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:?}", err);
    }
}
