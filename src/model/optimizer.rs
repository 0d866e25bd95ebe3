use std::time::Instant;

// Reflection, expansion, contraction, shrink
const ALPHA: f64 = 1.0;
const GAMMA: f64 = 2.0;
const RHO: f64 = 0.5;
const SIGMA: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Converged,
    IterationLimit,
    Deadline
}

#[derive(Debug, Clone)]
pub struct Minimum {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub termination: Termination
}

impl Minimum {
    pub fn converged(&self) -> bool {
        self.termination == Termination::Converged
    }
}

/// Nelder-Mead downhill simplex minimiser.
///
/// Non-finite objective values are treated as `+inf`, which lets callers
/// express constraints by rejecting points. The search stops once the spread of
/// objective values across the simplex falls below `tolerance` (relative to the
/// best value), after `max_iterations`, or when `deadline` passes.
#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub deadline: Option<Instant>
}

impl NelderMead {
    pub fn minimize<F>(&self, objective: &mut F, start: &[f64], steps: &[f64]) -> Minimum
    where
        F: FnMut(&[f64]) -> f64
    {
        let n = start.len();
        let mut eval = |x: &[f64]| {
            let v = objective(x);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(start.to_vec());
        for (i, step) in steps.iter().enumerate() {
            let mut vertex = start.to_vec();
            vertex[i] += step;
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|x| eval(x)).collect();

        let mut iterations = 0;
        let termination = loop {
            sort_simplex(&mut simplex, &mut values);

            let best = values[0];
            let worst = values[n];
            if worst.is_finite() && worst - best <= self.tolerance * (1.0 + best.abs()) {
                break Termination::Converged;
            }

            if iterations >= self.max_iterations {
                break Termination::IterationLimit;
            }

            if self.deadline.is_some_and(|d| Instant::now() >= d) {
                break Termination::Deadline;
            }

            iterations += 1;

            let centroid = centroid(&simplex[..n]);
            let reflected = along(&centroid, &simplex[n], -ALPHA);
            let f_reflected = eval(&reflected);

            if f_reflected < values[0] {
                let expanded = along(&centroid, &simplex[n], -GAMMA);
                let f_expanded = eval(&expanded);

                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[n - 1] {
                simplex[n] = reflected;
                values[n] = f_reflected;
                continue;
            }

            // Contract towards the better of the reflected and worst points
            let (contracted, accept) = if f_reflected < values[n] {
                let outside = along(&centroid, &reflected, RHO);
                let f_outside = eval(&outside);
                ((outside, f_outside), f_outside <= f_reflected)
            } else {
                let inside = along(&centroid, &simplex[n], RHO);
                let f_inside = eval(&inside);
                ((inside, f_inside), f_inside < values[n])
            };

            if accept {
                simplex[n] = contracted.0;
                values[n] = contracted.1;
                continue;
            }

            let best_vertex = simplex[0].clone();
            for i in 1..=n {
                simplex[i] = along(&best_vertex, &simplex[i], SIGMA);
                values[i] = eval(&simplex[i]);
            }
        };

        Minimum {
            point: simplex.swap_remove(0),
            value: values[0],
            iterations,
            termination
        }
    }
}

fn sort_simplex(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));

    *simplex = order.iter().map(|&i| simplex[i].clone()).collect();
    *values = order.iter().map(|&i| values[i]).collect();
}

fn centroid(vertices: &[Vec<f64>]) -> Vec<f64> {
    let n = vertices.len() as f64;
    let dim = vertices[0].len();

    (0..dim).map(|j| vertices.iter().map(|v| v[j]).sum::<f64>() / n).collect()
}

/// `origin + t·(target - origin)`
fn along(origin: &[f64], target: &[f64], t: f64) -> Vec<f64> {
    origin.iter().zip(target).map(|(o, p)| o + t * (p - o)).collect()
}
