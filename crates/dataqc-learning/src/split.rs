//! Stratified train/validation split.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Row positions of a split, each sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Hold out `ceil(fraction * n)` rows, stratified by class.
///
/// `classes[i]` is the class index of row `i`. Each class keeps at least one
/// training row, so the held-out set can be smaller than requested on tiny
/// datasets. Classes receive validation rows in proportion to their size;
/// leftover slots go to the classes with the most rows.
pub fn stratified_split(classes: &[usize], n_classes: usize, fraction: f64, seed: u64) -> Split {
    let n = classes.len();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut groups: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &class) in classes.iter().enumerate() {
        groups[class].push(row);
    }
    for group in &mut groups {
        group.shuffle(&mut rng);
    }

    let n_validation = ((fraction * n as f64).ceil() as usize).min(n);

    let mut quotas: Vec<usize> = groups
        .iter()
        .map(|group| {
            let share = n_validation * group.len() / n.max(1);
            share.min(group.len().saturating_sub(1))
        })
        .collect();

    let mut by_size: Vec<usize> = (0..n_classes).collect();
    by_size.sort_by(|&a, &b| groups[b].len().cmp(&groups[a].len()).then(a.cmp(&b)));

    let mut assigned: usize = quotas.iter().sum();
    while assigned < n_validation {
        let mut progressed = false;
        for &class in &by_size {
            if assigned == n_validation {
                break;
            }
            if quotas[class] + 1 < groups[class].len() {
                quotas[class] += 1;
                assigned += 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    let mut train = Vec::with_capacity(n - assigned);
    let mut validation = Vec::with_capacity(assigned);
    for (group, quota) in groups.iter().zip(quotas) {
        validation.extend_from_slice(&group[..quota]);
        train.extend_from_slice(&group[quota..]);
    }
    train.sort_unstable();
    validation.sort_unstable();

    Split { train, validation }
}
