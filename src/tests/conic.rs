//! Non-polyhedral cone scenarios.

use crate::linalg::vector_ops::norm;
use crate::tests::{assert_close, test_settings};
use crate::{Cone, Data, Status, solve};

/// `min x1  s.t.  x1 >= 1 + ||(x2, x3)||` via `-x + s = b, s in SOC(3)`.
fn soc_program() -> (Data, Cone) {
    let data = Data::new(
        3,
        3,
        vec![0, 1, 2, 3],
        vec![0, 1, 2],
        vec![-1.0, -1.0, -1.0],
        vec![-1.0, 0.0, 0.0],
        vec![1.0, 0.0, 0.0],
    );
    (data, Cone::soc(&[3]))
}

/// `min x  s.t.  x*I - diag(1, 2) is PSD` -- the optimum is the largest
/// eigenvalue, 2. The slack block stores the full 2x2 matrix column-major.
fn psd_program() -> (Data, Cone) {
    let data = Data::new(
        4,
        1,
        vec![0, 2],
        vec![0, 3],
        vec![-1.0, -1.0],
        vec![-1.0, 0.0, 0.0, -2.0],
        vec![1.0],
    );
    (
        data,
        Cone {
            psd: vec![2],
            ..Cone::default()
        },
    )
}

#[test]
fn test_soc_feasibility() {
    let (data, cone) = soc_program();
    let (sol, info) = solve(&data, &cone, &test_settings());

    assert_eq!(info.status_val, Status::Solved.value());
    assert_close(&sol.x, &[1.0, 0.0, 0.0], 1e-2);
    assert!((info.pobj - 1.0).abs() < 1e-2);
    // the optimum satisfies the cone constraint
    assert!(norm(&sol.x[1..]) <= sol.x[0] + 1e-6);
}

#[test]
fn test_psd_smallest_upper_bound() {
    let (data, cone) = psd_program();
    let (sol, info) = solve(&data, &cone, &test_settings());

    assert_eq!(info.status_val, Status::Solved.value());
    assert_close(&sol.x, &[2.0], 1e-2);
    // slack is x*I - C, which is PSD at the optimum
    assert!(sol.s[0] >= -1e-4);
    assert!(sol.s[3] >= -1e-4);
}

#[test]
fn test_mixed_cone_dimensions_must_match() {
    let (data, _) = soc_program();
    let cone = Cone::soc(&[2]); // total dim 2 != m = 3
    let (_, info) = solve(&data, &cone, &test_settings());
    assert_eq!(info.status_val, Status::Failure.value());
}
