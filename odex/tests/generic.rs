use approx::assert_abs_diff_eq;
use odex::{GenericOde, OdeSolver, OdeSystem, SolverErrors, TimeSpan};

#[test]
fn resizing_up_and_down() {
    let mut solver = OdeSolver::new(GenericOde::two_d());
    solver
        .update_ode(|kind| kind.as_generic_mut().map(|ode| ode.set_num_vars(4)))
        .unwrap()
        .unwrap();
    assert_eq!(solver.ode().variables(), ["x", "y", "x2", "x3"]);
    assert_eq!(solver.initial_state(), &[5.0; 4]);
    assert_eq!(solver.solution().unwrap().y.ncols(), 4);

    solver
        .update_ode(|kind| kind.as_generic_mut().map(|ode| ode.set_num_vars(2)))
        .unwrap()
        .unwrap();
    assert_eq!(solver.ode().variables(), ["x", "y"]);
    assert_eq!(solver.initial_state(), &[5.0; 2]);
    let solution = solver.solution().unwrap();
    assert_eq!(solution.y.ncols(), 2);
    assert_eq!(solution.variables, vec!["x", "y"]);
}

#[test]
fn rotation_preserves_radius() {
    let mut solver = OdeSolver::new(GenericOde::two_d())
        .with_initial_state(vec![1.0, 0.0])
        .unwrap()
        .with_times(TimeSpan::linspace(0.0, std::f64::consts::PI, 100))
        .unwrap();
    let solution = solver.solution().unwrap();
    let end = solution.final_state().unwrap();
    assert_abs_diff_eq!(end[0], -1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(end[1], 0.0, epsilon = 1e-6);
}

#[test]
fn undefined_variable_flags_the_ode_without_panicking() {
    let mut solver = OdeSolver::new(GenericOde::default());
    solver.update_ode(|kind| {
        if let Some(ode) = kind.as_generic_mut() {
            ode.set_equation(0, "-x0 * k").unwrap();
        }
    });
    assert!(solver.solution().is_none());
    assert!(solver.ode().error());
    assert!(matches!(
        solver.last_error(),
        Some(SolverErrors::Integration(_))
    ));
    let message = solver.last_error().unwrap().to_string();
    assert!(message.contains("undefined variable: k"), "{message}");
}

#[test]
fn time_dependent_forcing() {
    let mut ode = GenericOde::default();
    ode.set_equation(0, "cos(t)").unwrap();
    assert_eq!(ode.name(), "Generic ODE");
    let mut solver = OdeSolver::new(ode)
        .with_initial_state(vec![0.0])
        .unwrap()
        .with_times(TimeSpan::linspace(0.0, 1.0, 10))
        .unwrap();
    let solution = solver.solution().unwrap();
    assert_abs_diff_eq!(solution.y[(10, 0)], 1.0f64.sin(), epsilon = 1e-7);
}
