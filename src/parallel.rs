//! Data-parallel fan-out over disjoint output chunks.
//!
//! Every parallel section of the crate goes through [`parallel_for`] or
//! [`parallel_for_init`]: the output buffer is split into `stride`-sized
//! chunks and each chunk is handed, together with its index, to exactly one
//! worker.  The rayon global pool does the scheduling; on `wasm32`, or when
//! the pool only has one thread, the chunks are processed in order on the
//! calling thread.

#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

use crate::error::Result;

fn use_parallel(nb_chunks: usize) -> bool {
    #[cfg(not(target_arch = "wasm32"))]
    {
        nb_chunks > 1 && rayon::current_num_threads() > 1
    }
    #[cfg(target_arch = "wasm32")]
    {
        let _ = nb_chunks;
        false
    }
}

/// Calls `f(i, chunk)` for every `stride`-sized chunk of `out`.
///
/// The last chunk may be shorter.  The first error returned by a worker is
/// propagated; the other chunks may or may not have been processed.
pub fn parallel_for<T, F>(out: &mut [T], stride: usize, f: F) -> Result<()>
where
    T: Send,
    F: Fn(usize, &mut [T]) -> Result<()> + Send + Sync,
{
    let stride = stride.max(1);
    if use_parallel(out.len().div_ceil(stride)) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            return out
                .par_chunks_mut(stride)
                .enumerate()
                .try_for_each(|(i, chunk)| f(i, chunk));
        }
    }
    for (i, chunk) in out.chunks_mut(stride).enumerate() {
        f(i, chunk)?;
    }
    Ok(())
}

/// Like [`parallel_for`], but each worker first builds a scratch value with
/// `init` and reuses it across the chunks it processes.
pub fn parallel_for_init<T, S, I, F>(out: &mut [T], stride: usize, init: I, f: F) -> Result<()>
where
    T: Send,
    I: Fn() -> S + Send + Sync,
    F: Fn(&mut S, usize, &mut [T]) -> Result<()> + Send + Sync,
{
    let stride = stride.max(1);
    if use_parallel(out.len().div_ceil(stride)) {
        #[cfg(not(target_arch = "wasm32"))]
        {
            return out
                .par_chunks_mut(stride)
                .enumerate()
                .try_for_each_init(&init, |scratch, (i, chunk)| f(scratch, i, chunk));
        }
    }
    let mut scratch = init();
    for (i, chunk) in out.chunks_mut(stride).enumerate() {
        f(&mut scratch, i, chunk)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VortexError;

    #[test]
    fn test_chunks_are_disjoint_and_indexed() {
        let mut out = vec![0usize; 1000];
        parallel_for(&mut out, 64, |i, chunk| {
            for (j, x) in chunk.iter_mut().enumerate() {
                *x = i * 64 + j;
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(out, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_errors_are_propagated() {
        let mut out = vec![0u8; 16];
        let res = parallel_for(&mut out, 4, |i, _| {
            if i == 2 {
                Err(VortexError::Encoding("boom".into()))
            } else {
                Ok(())
            }
        });
        assert_eq!(res, Err(VortexError::Encoding("boom".into())));
    }

    #[test]
    fn test_scratch_is_reused_per_worker() {
        let mut out = vec![0u64; 256];
        parallel_for_init(
            &mut out,
            8,
            || vec![0u64; 8],
            |scratch, i, chunk| {
                for (s, x) in scratch.iter_mut().zip(chunk.iter_mut()) {
                    *s = i as u64;
                    *x = *s + 1;
                }
                Ok(())
            },
        )
        .unwrap();
        assert!(out.chunks(8).enumerate().all(|(i, c)| c.iter().all(|&x| x == i as u64 + 1)));
    }

    #[test]
    fn test_zero_stride_and_empty_output() {
        let mut out: Vec<u8> = Vec::new();
        parallel_for(&mut out, 0, |_, _| Ok(())).unwrap();
        let mut out = vec![1u8; 3];
        parallel_for(&mut out, 0, |_, c| {
            c[0] = 2;
            Ok(())
        })
        .unwrap();
        assert_eq!(out, vec![2, 2, 2]);
    }
}
