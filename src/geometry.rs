use anyhow::{anyhow, Result};

/// Terminal glyphs are taller than they are wide; the grid aspect is scaled by this factor.
pub const GLYPH_ASPECT_CORRECTION: f64 = 0.45;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalSize {
    pub columns: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphGrid {
    pub width: u32,
    pub height: u32,
}

/// Fits the largest grid with corrected aspect `width / height = source_aspect * k`
/// inside the terminal, then shrinks it uniformly so it never exceeds the source
/// resolution (a frame is never upscaled).
///
/// Both output axes are in `1..=columns` and `1..=rows`.
pub fn fit_glyph_grid(source_width: u32, source_height: u32, terminal: TerminalSize) -> Result<GlyphGrid> {
    if source_width == 0 || source_height == 0 {
        return Err(anyhow!(
            "source dimensions must be > 0 (got {}x{})",
            source_width,
            source_height
        ));
    }
    if terminal.columns == 0 || terminal.rows == 0 {
        return Err(anyhow!(
            "terminal dimensions must be > 0 (got {}x{})",
            terminal.columns,
            terminal.rows
        ));
    }

    let k = GLYPH_ASPECT_CORRECTION;
    let columns = terminal.columns as f64;
    let rows = terminal.rows as f64;
    let source_aspect = source_width as f64 / source_height as f64;
    let terminal_aspect = (columns / rows) / k;

    let (mut width, mut height) = if terminal_aspect < source_aspect {
        (columns, (columns / source_aspect / k).round())
    } else {
        ((rows * source_aspect * k).round(), rows)
    };

    // Float guard only: in the width-constrained branch columns / aspect / k <= rows.
    if height > rows {
        height = rows;
        width = (rows * source_aspect * k).round();
    }

    let shrink = (source_width as f64 / width.max(1.0))
        .min(source_height as f64 / height.max(1.0))
        .min(1.0);
    width = (width * shrink).round();
    height = (height * shrink).round();

    Ok(GlyphGrid {
        width: clamp_axis(width, terminal.columns),
        height: clamp_axis(height, terminal.rows),
    })
}

fn clamp_axis(value: f64, max: u32) -> u32 {
    if !value.is_finite() {
        return 1;
    }
    (value as u32).clamp(1, max)
}
