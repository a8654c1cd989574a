//! Akima spline interpolation over strictly increasing knots.
//!
//! Each knot's slope is a weighted average of the neighbouring secant slopes.
//! Fewer than three knots degrade to linear interpolation.

/// A 1-D piecewise cubic Hermite interpolant.
#[derive(Clone, Debug)]
pub struct AkimaSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// First derivative at each knot
    slopes: Vec<f64>,
}

impl AkimaSpline {
    /// Fit a spline through `(xs[i], ys[i])`. Returns `None` if the inputs are
    /// empty, of different lengths, or `xs` is not strictly increasing.
    pub fn new(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.is_empty() || xs.len() != ys.len() {
            return None;
        }
        if xs.windows(2).any(|w| w[1].is_nan() || w[1] <= w[0]) {
            return None;
        }

        let slopes = knot_slopes(xs, ys);
        Some(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            slopes,
        })
    }

    /// Evaluate the spline. Values outside the knot range extend the end segments.
    pub fn value(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if n == 1 {
            return self.ys[0];
        }

        // segment i spans xs[i]..xs[i + 1]
        let i = self.xs.partition_point(|&k| k <= x).saturating_sub(1).min(n - 2);

        let h = self.xs[i + 1] - self.xs[i];
        let t = (x - self.xs[i]) / h;
        let t2 = t * t;
        let t3 = t2 * t;

        let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
        let h10 = t3 - 2.0 * t2 + t;
        let h01 = -2.0 * t3 + 3.0 * t2;
        let h11 = t3 - t2;

        h00 * self.ys[i] + h10 * h * self.slopes[i] + h01 * self.ys[i + 1] + h11 * h * self.slopes[i + 1]
    }
}

fn knot_slopes(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    if n == 1 {
        return vec![0.0];
    }

    let secants: Vec<f64> = (0..n - 1)
        .map(|i| (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]))
        .collect();

    if n == 2 {
        return vec![secants[0]; 2];
    }

    // Pad with two extrapolated secants on each side: m[k + 2] is secant k
    let mut m = Vec::with_capacity(n + 3);
    let first = secants[0];
    let second = secants[1];
    m.push(3.0 * first - 2.0 * second);
    m.push(2.0 * first - second);
    m.extend_from_slice(&secants);
    let last = secants[n - 2];
    let before_last = secants[n - 3];
    m.push(2.0 * last - before_last);
    m.push(3.0 * last - 2.0 * before_last);

    (0..n)
        .map(|i| {
            let w_right = (m[i + 3] - m[i + 2]).abs();
            let w_left = (m[i + 1] - m[i]).abs();
            if w_right + w_left < 1e-12 {
                (m[i + 1] + m[i + 2]) / 2.0
            } else {
                (w_right * m[i + 1] + w_left * m[i + 2]) / (w_right + w_left)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_through_knots() {
        let xs = [0.0, 3.0, 6.0, 9.0, 12.0, 15.0];
        let ys = [1.0, 4.0, -2.0, 0.5, 7.0, 7.0];
        let spline = AkimaSpline::new(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert!((spline.value(*x) - y).abs() < 1e-9);
        }
    }

    #[test]
    fn test_reproduces_straight_lines() {
        let xs: Vec<f64> = (0..8).map(|i| i as f64 * 3.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x - 5.0).collect();
        let spline = AkimaSpline::new(&xs, &ys).unwrap();
        for i in 0..=42 {
            let x = i as f64 * 0.5;
            assert!((spline.value(x) - (2.0 * x - 5.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_flat_section_has_no_overshoot() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let spline = AkimaSpline::new(&xs, &ys).unwrap();
        for i in 0..=50 {
            let v = spline.value(i as f64 * 0.1);
            assert!((-1e-9..=1.0 + 1e-9).contains(&v), "overshoot {}", v);
        }
    }

    #[test]
    fn test_short_inputs() {
        assert!(AkimaSpline::new(&[], &[]).is_none());
        assert!(AkimaSpline::new(&[0.0, 0.0], &[1.0, 2.0]).is_none());

        let single = AkimaSpline::new(&[2.0], &[5.0]).unwrap();
        assert_eq!(single.value(10.0), 5.0);

        let line = AkimaSpline::new(&[0.0, 2.0], &[0.0, 4.0]).unwrap();
        assert!((line.value(1.0) - 2.0).abs() < 1e-12);
    }
}
