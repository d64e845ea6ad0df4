use tracing::{debug, info};

use crate::config::UNREACHABLE_DISTANCE;
use crate::error::{DispatchError, Result};

/// Pairwise measurements as ingested, before shortest-path closure.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDistanceMatrix {
    rows: Vec<Vec<f64>>,
}

/// All-pairs shortest distances. Only constructible by closing a raw matrix or
/// by validating that a given matrix is already closed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClosedDistanceMatrix {
    rows: Vec<Vec<f64>>,
}

fn check_value(row: usize, col: usize, value: f64) -> Result<f64> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(DispatchError::InvalidDistance { row, col, value })
    }
}

fn check_square(rows: &[Vec<f64>]) -> Result<()> {
    let n = rows.len();
    if rows.iter().any(|r| r.len() != n) {
        return Err(DispatchError::NonSquareMatrix {
            rows: n,
            locations: rows.iter().map(Vec::len).max().unwrap_or(0),
        });
    }
    Ok(())
}

impl RawDistanceMatrix {
    /// Takes the upper triangle of a square matrix and mirrors it into the
    /// lower triangle. The diagonal is forced to zero.
    pub fn from_rows(mut rows: Vec<Vec<f64>>) -> Result<Self> {
        check_square(&rows)?;
        let n = rows.len();
        for i in 0..n {
            rows[i][i] = 0.0;
            for j in (i + 1)..n {
                let d = check_value(i, j, rows[i][j])?;
                rows[j][i] = d;
            }
        }
        Ok(Self { rows })
    }

    /// Builds a symmetric matrix from a possibly ragged table where each pair
    /// is measured in at least one triangle. Pairs measured in neither get
    /// [`UNREACHABLE_DISTANCE`].
    pub fn from_triangular(cells: &[Vec<Option<f64>>], size: usize) -> Result<Self> {
        if cells.len() != size || cells.iter().any(|r| r.len() > size) {
            return Err(DispatchError::NonSquareMatrix {
                rows: cells.len(),
                locations: size,
            });
        }
        let cell = |i: usize, j: usize| cells[i].get(j).copied().flatten();
        let mut rows = vec![vec![0.0; size]; size];
        let mut missing = 0usize;
        for i in 0..size {
            for j in (i + 1)..size {
                let d = match cell(i, j).or_else(|| cell(j, i)) {
                    Some(d) => check_value(i, j, d)?,
                    None => {
                        missing += 1;
                        UNREACHABLE_DISTANCE
                    }
                };
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }
        if missing > 0 {
            debug!("{} location pairs had no measurement", missing);
        }
        Ok(Self { rows })
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.rows[from][to]
    }

    /// Runs Floyd-Warshall to full closure.
    pub fn close(self) -> ClosedDistanceMatrix {
        let mut rows = self.rows;
        let shortened = floyd_warshall(&mut rows);
        info!(
            "Closed {}x{} distance matrix ({} entries shortened)",
            rows.len(),
            rows.len(),
            shortened
        );
        ClosedDistanceMatrix { rows }
    }
}

/// In-place all-pairs shortest path. Returns the number of entry updates.
///
/// Sweeps repeat until one makes no update. With fractional miles a single
/// sweep can leave `d[i][j] > d[i][k] + d[k][j]` by a rounding step; every
/// update strictly lowers an entry so the loop terminates.
pub fn floyd_warshall(dm: &mut [Vec<f64>]) -> usize {
    let mut updates = 0;
    let mut sweeps = 0;
    loop {
        let changed = sweep(dm);
        sweeps += 1;
        if changed == 0 {
            break;
        }
        updates += changed;
    }
    if sweeps > 2 {
        debug!("Closure settled after {} sweeps", sweeps);
    }
    updates
}

fn sweep(dm: &mut [Vec<f64>]) -> usize {
    let n = dm.len();
    let mut updates = 0;
    for k in 0..n {
        for i in 0..n {
            let d_ik = dm[i][k];
            for j in 0..n {
                let via = d_ik + dm[k][j];
                if via < dm[i][j] {
                    dm[i][j] = via;
                    updates += 1;
                }
            }
        }
    }
    updates
}

impl ClosedDistanceMatrix {
    /// Accepts a matrix only if it is square, symmetric and satisfies the
    /// triangle inequality.
    pub fn from_closed_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        check_square(&rows)?;
        let n = rows.len();
        for i in 0..n {
            for j in 0..n {
                let d = check_value(i, j, rows[i][j])?;
                if (i == j && d != 0.0) || d != rows[j][i] {
                    return Err(DispatchError::InvalidDistance {
                        row: i,
                        col: j,
                        value: d,
                    });
                }
            }
        }
        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    let via = rows[i][k] + rows[k][j];
                    if rows[i][j] > via {
                        return Err(DispatchError::UnclosedMatrix {
                            i,
                            j,
                            k,
                            direct: rows[i][j],
                            via,
                        });
                    }
                }
            }
        }
        Ok(Self { rows })
    }

    pub fn size(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.rows[from][to]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}
