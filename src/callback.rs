//! Per-solve progress output.
//!
//! The driver reports through a [`Callback`]: a banner before the first
//! iteration, a summary row at a fixed interval, and a footer with either
//! error metrics or an infeasibility/unboundedness certificate. The default
//! implementations do nothing, so a callback only overrides what it needs.

use crate::cones::Cone;
use crate::problem::Data;
use crate::solver::residuals::Residuals;
use crate::{E, Info, Settings, Status};

/// Iterations between printed summary rows.
pub(crate) const PRINT_INTERVAL: usize = 100;

const HEADER: [&str; 8] = [
    " Iter ",
    " pri res ",
    " dua res ",
    " rel gap ",
    " pri obj ",
    " dua obj ",
    "  kappa  ",
    " time (s)",
];

/// Hooks invoked by the solve loop for logging or monitoring.
pub trait Callback {
    /// Called once after workspace setup, before the first iteration.
    fn header(&mut self, _data: &Data, _cone: &Cone, _settings: &Settings, _method: &str) {}

    /// Called every [`PRINT_INTERVAL`] iterations and once after the loop.
    fn summary(&mut self, _iter: usize, _residuals: &Residuals, _elapsed: E) {}

    /// Called once after solution extraction.
    fn footer(&mut self, _info: &Info, _hit_max_iters: bool, _linsys_summary: Option<String>) {}
}

/// A callback that does nothing. Used when verbose output is off.
pub struct NoOpCallback;

impl Callback for NoOpCallback {}

/// Prints the standard solver table to stdout.
pub struct SummaryPrinter {
    line_len: usize,
}

impl SummaryPrinter {
    pub fn new() -> Self {
        Self {
            line_len: HEADER.iter().map(|h| h.len() + 1).sum::<usize>() - 1,
        }
    }

    fn rule(&self, c: char) {
        println!("{}", c.to_string().repeat(self.line_len));
    }
}

impl Default for SummaryPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl Callback for SummaryPrinter {
    fn header(&mut self, data: &Data, cone: &Cone, settings: &Settings, method: &str) {
        self.rule('-');
        println!(
            "\n\tsplitcone v{} - splitting conic solver\n",
            env!("CARGO_PKG_VERSION")
        );
        self.rule('-');
        println!("method: {method}");
        println!(
            "eps = {:.2e}, alpha = {:.2}, max_iters = {}, normalize = {}",
            settings.eps, settings.alpha, settings.max_iters, settings.normalize as u8
        );
        println!(
            "variables n = {}, constraints m = {}, non-zeros in A = {}",
            data.num_vars(),
            data.num_cons(),
            data.nnz()
        );
        if settings.warm_start {
            println!("using variable warm-starting!");
        }
        print!("{}", cone.header());
        self.rule('-');
        let mut columns = String::new();
        for h in &HEADER[..HEADER.len() - 1] {
            columns.push_str(h);
            columns.push('|');
        }
        columns.push_str(HEADER[HEADER.len() - 1]);
        println!("{columns}");
        self.rule('=');
    }

    fn summary(&mut self, iter: usize, r: &Residuals, elapsed: E) {
        print!("{:>width$}|", iter, width = HEADER[0].len());
        print!(" {:>width$.2e} ", r.res_pri, width = HEADER[1].len() - 2);
        print!(" {:>width$.2e} ", r.res_dual, width = HEADER[2].len() - 2);
        print!(" {:>width$.2e} ", r.rel_gap, width = HEADER[3].len() - 2);
        print!(" {:>width$.2e} ", r.c_tx, width = HEADER[4].len() - 2);
        print!(" {:>width$.2e} ", -r.b_ty, width = HEADER[5].len() - 2);
        print!(" {:>width$.2e} ", r.kap, width = HEADER[6].len() - 2);
        println!(" {:>width$.2e}", elapsed, width = HEADER[7].len() - 2);
    }

    fn footer(&mut self, info: &Info, hit_max_iters: bool, linsys_summary: Option<String>) {
        self.rule('-');
        println!("Status: {}", info.status);
        if hit_max_iters {
            println!("Hit MAX_ITERS, solution may be inaccurate");
        }
        println!("Time taken: {:.4} seconds", info.time);
        if let Some(summary) = linsys_summary {
            print!("{summary}");
        }
        self.rule('-');

        if info.status_val == Status::Infeasible.value() {
            println!("Certificate of primal infeasibility:");
            println!("|A'y|_2 * |b|_2 = {:.4e}", info.res_dual);
            println!("dist(y, K*) = 0");
            println!("b'y = {:.4}", info.dobj);
        } else if info.status_val == Status::Unbounded.value() {
            println!("Certificate of dual infeasibility:");
            println!("|Ax + s|_2 * |c|_2 = {:.4e}", info.res_pri);
            println!("dist(s, K) = 0");
            println!("c'x = {:.4}", info.pobj);
        } else {
            println!("Error metrics:");
            println!("|Ax + s - b|_2 / (1 + |b|_2) = {:.4e}", info.res_pri);
            println!("|A'y + c|_2 / (1 + |c|_2) = {:.4e}", info.res_dual);
            println!("|c'x + b'y| / (1 + |c'x| + |b'y|) = {:.4e}", info.rel_gap);
            println!("dist(s, K) = 0, dist(y, K*) = 0, s'y = 0");
            self.rule('-');
            println!("c'x = {:.4}, -b'y = {:.4}", info.pobj, info.dobj);
        }
        self.rule('=');
    }
}
