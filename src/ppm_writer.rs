use std::fs::File;
use std::io::{prelude::*, BufWriter};
use std::path::Path;

use anyhow::Result;
use gif_player::{Bitmap, Gfx};

const MAGIC_NUMBER: &[u8] = b"P3";

pub fn write_ppm(path: &Path, bitmap: &Bitmap) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_pixels(&mut writer, bitmap)?;
    writer.flush()?;

    Ok(())
}

fn write_pixels<W: Write>(writer: &mut W, bitmap: &Bitmap) -> Result<()> {
    writer.write_all(MAGIC_NUMBER)?;
    writer.write_all(b"\n")?;
    writeln!(writer, "{} {} 255", bitmap.width(), bitmap.height())?;

    let row_len = usize::from(bitmap.width()).max(1);
    for row in bitmap.pixels().chunks(row_len) {
        for (i, color) in row.iter().enumerate() {
            if i != 0 {
                writer.write_all(b" ")?;
            }
            write!(writer, "{: >3} {: >3} {: >3}", color.red, color.green, color.blue)?;
        }
        writer.write_all(b"\n")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use gif_player::Color;

    use super::*;

    #[test]
    fn writes_plain_ppm() {
        let mut bitmap = Bitmap::try_new(2, 1).unwrap();
        bitmap.draw_pixel(1, 0, Color::new(255, 8, 40));

        let mut out = Vec::new();
        write_pixels(&mut out, &bitmap).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "P3\n2 1 255\n  0   0   0 255   8  40\n");
    }
}
