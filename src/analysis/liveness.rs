use std::collections::BTreeSet;

use super::usedef::ProgramPoint;

/// Live-in / live-out sets per program point.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Liveness {
    pub live_in: Vec<BTreeSet<String>>,
    pub live_out: Vec<BTreeSet<String>>,
}

impl Liveness {
    /// Backward dataflow from empty sets to the least fixed point.
    pub fn analyze(points: &[ProgramPoint]) -> Self {
        let empty = Liveness {
            live_in: vec![BTreeSet::new(); points.len()],
            live_out: vec![BTreeSet::new(); points.len()],
        };
        Self::refine(points, empty)
    }

    /// Iterates the dataflow equations starting from `seed` until nothing
    /// changes:
    ///
    ///   out[n] = U in[s] for s in succ(n)
    ///   in[n]  = use[n] U (out[n] - def[n])
    ///
    /// Sets only ever grow, so this terminates. Points are visited in
    /// descending order, which settles forward-numbered code in few passes.
    pub fn refine(points: &[ProgramPoint], mut seed: Liveness) -> Self {
        if points.is_empty() {
            return Liveness::default();
        }

        let mut passes = 0;
        loop {
            passes += 1;
            let mut changed = false;

            for idx in (0..points.len()).rev() {
                let point = &points[idx];

                let mut out = BTreeSet::new();
                for &succ in &point.succs {
                    out.extend(seed.live_in[succ].iter().cloned());
                }

                let mut live_in = point.uses.clone();
                live_in.extend(out.difference(&point.defs).cloned());

                if out != seed.live_out[idx] || live_in != seed.live_in[idx] {
                    changed = true;
                    seed.live_out[idx] = out;
                    seed.live_in[idx] = live_in;
                }
            }

            if !changed {
                break;
            }
        }

        log::debug!("liveness reached a fixed point after {passes} passes");
        seed
    }
}
