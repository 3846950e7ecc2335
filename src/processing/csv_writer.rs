use nalgebra::DMatrix;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::processing::inspection::ElementTemperatures;

/// Writes a layer map, one line per grid row starting from row 0, one column
/// per grid column.
pub fn write_thermal_map<P: AsRef<Path>>(path: P, map: &DMatrix<f64>) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    let headers: Vec<String> = (0..map.ncols()).map(|c| format!("c{}", c)).collect();
    writeln!(file, "{}", headers.join(","))?;

    for row in map.row_iter() {
        let line: Vec<String> = row.iter().map(|t| format!("{:.6}", t)).collect();
        writeln!(file, "{}", line.join(","))?;
    }

    file.flush()
}

/// One line per floorplan element.
pub fn write_element_temperatures<P: AsRef<Path>>(
    path: P,
    stats: &[ElementTemperatures],
) -> io::Result<()> {
    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "die,element,max,min,avg")?;
    for s in stats {
        writeln!(file, "{},{},{:.6},{:.6},{:.6}", s.die, s.element, s.max, s.min, s.avg)?;
    }

    file.flush()
}

/// Time series: one line per sample, `time` followed by one value per header.
pub fn write_time_series<P: AsRef<Path>>(
    path: P,
    headers: &[&str],
    samples: &[(f64, Vec<f64>)],
) -> io::Result<()> {
    if let Some((_, values)) = samples.iter().find(|(_, values)| values.len() != headers.len()) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "Headers count ({}) doesn't match sample width ({})",
                headers.len(),
                values.len()
            ),
        ));
    }

    let mut file = BufWriter::new(File::create(path)?);

    writeln!(file, "time,{}", headers.join(","))?;
    for (time, values) in samples {
        let line: Vec<String> = values.iter().map(|v| format!("{:.6}", v)).collect();
        writeln!(file, "{:.6e},{}", time, line.join(","))?;
    }

    file.flush()
}
