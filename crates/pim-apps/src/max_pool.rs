//! Max pooling over a stack of Int32 matrices
//!
//! Each depth slice is decomposed into `kernel_h * kernel_w` rows, one row
//! per kernel offset and one column per output position:
//!
//! ```text
//! input 4x4, kernel 2x2, stride 2       decomposed (4 rows x 4 outputs)
//!
//!  a b c d                               offset (0,0): a c i k
//!  e f g h                               offset (0,1): b d j l
//!  i j k l                               offset (1,0): e g m o
//!  m n o p                               offset (1,1): f h n p
//! ```
//!
//! Rows of consecutive slices are concatenated, uploaded as associated
//! objects and folded with the native `max` into row 0.

use crate::error::{AppError, Result};
use pim_backends::{DataType, Device, DeviceExt, ObjectChain, Operands, PimOp};
use rand::Rng;
use tracing::debug;

/// Kernel window and stride
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolParams {
    pub kernel_height: usize,
    pub kernel_width: usize,
    pub stride: usize,
}

impl Default for PoolParams {
    fn default() -> Self {
        Self {
            kernel_height: 2,
            kernel_width: 2,
            stride: 2,
        }
    }
}

impl PoolParams {
    /// Output height and width for a `rows x cols` input
    pub fn output_dims(&self, rows: usize, cols: usize) -> Result<(usize, usize)> {
        if self.kernel_height == 0 || self.kernel_width == 0 || self.stride == 0 {
            return Err(AppError::invalid(format!("degenerate pooling parameters {self:?}")));
        }
        if self.kernel_height > rows || self.kernel_width > cols {
            return Err(AppError::invalid(format!(
                "{}x{} kernel does not fit a {rows}x{cols} input",
                self.kernel_height, self.kernel_width
            )));
        }
        Ok((
            (rows - self.kernel_height) / self.stride + 1,
            (cols - self.kernel_width) / self.stride + 1,
        ))
    }

    pub fn window(&self) -> usize {
        self.kernel_height * self.kernel_width
    }
}

/// Depth x rows x cols, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    depth: usize,
    rows: usize,
    cols: usize,
    data: Vec<i32>,
}

impl Volume {
    pub fn new(depth: usize, rows: usize, cols: usize, data: Vec<i32>) -> Result<Self> {
        if depth == 0 || rows == 0 || cols == 0 {
            return Err(AppError::invalid(format!("empty volume {depth}x{rows}x{cols}")));
        }
        if data.len() != depth * rows * cols {
            return Err(AppError::invalid(format!(
                "{} values do not fill a {depth}x{rows}x{cols} volume",
                data.len()
            )));
        }
        Ok(Self { depth, rows, cols, data })
    }

    /// Uniform values in `[0, max_value]`
    pub fn random(depth: usize, rows: usize, cols: usize, max_value: i32, rng: &mut impl Rng) -> Result<Self> {
        let data = (0..depth * rows * cols).map(|_| rng.gen_range(0..=max_value)).collect();
        Self::new(depth, rows, cols, data)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, d: usize, r: usize, c: usize) -> i32 {
        self.data[(d * self.rows + r) * self.cols + c]
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    fn slice(&self, d: usize) -> &[i32] {
        let len = self.rows * self.cols;
        &self.data[d * len..(d + 1) * len]
    }
}

/// Rows of one depth slice, one per kernel offset
pub fn decompose(input: &Volume, d: usize, params: &PoolParams) -> Result<Vec<Vec<i32>>> {
    let (out_h, out_w) = params.output_dims(input.rows, input.cols)?;
    let mut rows = vec![Vec::with_capacity(out_h * out_w); params.window()];
    for i in 0..out_h {
        for j in 0..out_w {
            for m in 0..params.kernel_height {
                for n in 0..params.kernel_width {
                    let value = input.get(d, i * params.stride + m, j * params.stride + n);
                    rows[m * params.kernel_width + n].push(value);
                }
            }
        }
    }
    Ok(rows)
}

/// Max pooling on the device
///
/// Depth slices are processed in chunks sized to what one object can span.
pub fn max_pool(device: &mut dyn Device, input: &Volume, params: &PoolParams) -> Result<Volume> {
    let (out_h, out_w) = params.output_dims(input.rows, input.cols)?;
    let per_slice = out_h * out_w;
    let config = device.config();
    let capacity = (config.num_cores * config.num_cols) as usize;
    let slices_per_pass = capacity / per_slice;
    if slices_per_pass == 0 {
        return Err(AppError::invalid(format!(
            "{per_slice} outputs per slice exceed the device's {capacity} columns"
        )));
    }

    let mut output = Vec::with_capacity(input.depth * per_slice);
    for first in (0..input.depth).step_by(slices_per_pass) {
        let last = (first + slices_per_pass).min(input.depth);
        let mut merged = vec![Vec::with_capacity((last - first) * per_slice); params.window()];
        for d in first..last {
            for (row, part) in merged.iter_mut().zip(decompose(input, d, params)?) {
                row.extend(part);
            }
        }
        debug!(slices = last - first, columns = merged[0].len(), "pooling chunk");
        output.extend(fold_max(device, &merged)?);
    }
    Volume::new(input.depth, out_h, out_w, output)
}

/// Element-wise maximum of equally long rows
fn fold_max(device: &mut dyn Device, rows: &[Vec<i32>]) -> Result<Vec<i32>> {
    let Some(first) = rows.first() else {
        return Err(AppError::invalid("nothing to pool"));
    };
    let mut chain = ObjectChain::new(device);
    let acc = chain.base(first.len() as u64, DataType::Int32)?;
    chain.device().copy_to_device(first, acc)?;
    for row in &rows[1..] {
        let obj = chain.associated(DataType::Int32)?;
        let device = chain.device();
        device.copy_to_device(row, obj)?;
        device.execute(PimOp::Max, Operands::binary(acc, obj, acc))?;
    }

    let mut out = vec![0i32; first.len()];
    chain.device().copy_from_device(acc, &mut out)?;
    chain.release()?;
    Ok(out)
}

/// Reference max pooling on the host
pub fn max_pool_cpu(input: &Volume, params: &PoolParams) -> Result<Volume> {
    let (out_h, out_w) = params.output_dims(input.rows, input.cols)?;
    let mut data = Vec::with_capacity(input.depth * out_h * out_w);
    for d in 0..input.depth {
        let slice = input.slice(d);
        for i in 0..out_h {
            for j in 0..out_w {
                let mut best = i32::MIN;
                for m in 0..params.kernel_height {
                    let row = (i * params.stride + m) * input.cols;
                    for n in 0..params.kernel_width {
                        best = best.max(slice[row + j * params.stride + n]);
                    }
                }
                data.push(best);
            }
        }
    }
    Volume::new(input.depth, out_h, out_w, data)
}

/// Positions where two results differ, as (depth, row, col)
pub fn mismatches(lhs: &Volume, rhs: &Volume) -> Result<Vec<(usize, usize, usize)>> {
    let (shape, other) = ((lhs.depth, lhs.rows, lhs.cols), (rhs.depth, rhs.rows, rhs.cols));
    if shape != other {
        return Err(AppError::invalid(format!("cannot compare {shape:?} with {other:?}")));
    }
    let plane = lhs.rows * lhs.cols;
    Ok(lhs
        .data
        .iter()
        .zip(&rhs.data)
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| (i / plane, (i % plane) / lhs.cols, i % lhs.cols))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pim_backends::{DeviceConfig, DeviceFamily, FunctionalDevice};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ramp(depth: usize, rows: usize, cols: usize) -> Volume {
        let data = (0..(depth * rows * cols) as i32).collect();
        Volume::new(depth, rows, cols, data).unwrap()
    }

    #[test]
    fn test_decompose_layout() {
        // 0  1  2  3
        // 4  5  6  7
        // 8  9 10 11
        // 12 13 14 15
        let rows = decompose(&ramp(1, 4, 4), 0, &PoolParams::default()).unwrap();
        assert_eq!(rows[0], vec![0, 2, 8, 10]);
        assert_eq!(rows[1], vec![1, 3, 9, 11]);
        assert_eq!(rows[2], vec![4, 6, 12, 14]);
        assert_eq!(rows[3], vec![5, 7, 13, 15]);
    }

    #[test]
    fn test_output_dims() {
        let p = PoolParams {
            kernel_height: 3,
            kernel_width: 2,
            stride: 1,
        };
        assert_eq!(p.output_dims(5, 4).unwrap(), (3, 3));
        assert!(p.output_dims(2, 4).is_err());
        assert!(PoolParams { stride: 0, ..p }.output_dims(5, 4).is_err());
    }

    #[test]
    fn test_device_matches_cpu() {
        let mut rng = StdRng::seed_from_u64(4);
        let input = Volume::random(3, 9, 7, 1000, &mut rng).unwrap();
        let params = PoolParams {
            kernel_height: 3,
            kernel_width: 2,
            stride: 2,
        };

        let mut device = FunctionalDevice::new(DeviceFamily::BitSimdV);
        let pim = max_pool(&mut device, &input, &params).unwrap();
        let cpu = max_pool_cpu(&input, &params).unwrap();
        assert_eq!((pim.depth(), pim.rows(), pim.cols()), (3, 4, 3));
        assert!(mismatches(&pim, &cpu).unwrap().is_empty());
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn test_chunks_depth_to_device_capacity() {
        // 4 outputs per slice, 8 columns: two slices per pass
        let mut device = FunctionalDevice::with_config(DeviceFamily::Simdram, DeviceConfig::new(1, 128, 8)).unwrap();
        let input = ramp(5, 4, 4);
        let pim = max_pool(&mut device, &input, &PoolParams::default()).unwrap();
        assert_eq!(pim, max_pool_cpu(&input, &PoolParams::default()).unwrap());
        assert_eq!(pim.get(4, 1, 1), 4 * 16 + 15);
    }

    #[test]
    fn test_mismatches_report_positions() {
        let a = ramp(2, 2, 2);
        let mut data = a.as_slice().to_vec();
        data[6] = -1;
        let b = Volume::new(2, 2, 2, data).unwrap();
        assert_eq!(mismatches(&a, &b).unwrap(), vec![(1, 1, 0)]);
        assert!(mismatches(&a, &ramp(1, 2, 2)).is_err());
    }
}
