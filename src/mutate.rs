use std::cmp::Ordering;

use rand::Rng;

use crate::dna::{Canvas, Chromosome, Gene, Shape};
use crate::island::IslandRange;

/// circle radii are drawn from 1..=MAX_RADIUS
pub const MAX_RADIUS: i32 = 50;

/// best individuals copied from each island to its ring neighbour per migration
pub const MIGRANTS_PER_ISLAND: usize = 1;

#[inline]
fn rand_x<R: Rng + ?Sized>(rng: &mut R, canvas: Canvas) -> i32 {
    rng.random_range(0..canvas.width.max(1)) as i32
}

#[inline]
fn rand_y<R: Rng + ?Sized>(rng: &mut R, canvas: Canvas) -> i32 {
    rng.random_range(0..canvas.height.max(1)) as i32
}

#[inline]
fn rand_radius<R: Rng + ?Sized>(rng: &mut R) -> i32 {
    rng.random_range(1..=MAX_RADIUS)
}

/// fair coin between circle and triangle, then uniform geometry and RGBA
pub fn random_gene<R: Rng + ?Sized>(rng: &mut R, canvas: Canvas) -> Gene {
    let shape = if rng.random_bool(0.5) {
        Shape::Circle { cx: rand_x(rng, canvas), cy: rand_y(rng, canvas), radius: rand_radius(rng) }
    } else {
        Shape::Triangle {
            x1: rand_x(rng, canvas),
            y1: rand_y(rng, canvas),
            x2: rand_x(rng, canvas),
            y2: rand_y(rng, canvas),
            x3: rand_x(rng, canvas),
            y3: rand_y(rng, canvas),
        }
    };
    Gene { shape, rgba: rng.random() }
}

/// replace every gene with a random one and mark the chromosome unevaluated
pub fn random_init<R: Rng + ?Sized>(chromosome: &mut Chromosome, rng: &mut R, canvas: Canvas) {
    profiling::scope!("random_init");
    for gene in chromosome.shapes.iter_mut() {
        *gene = random_gene(rng, canvas);
    }
    chromosome.fitness = crate::dna::FITNESS_SENTINEL;
}

/// the nine point mutations, drawn uniformly. slots 2..=6 resample a
/// coordinate; on a circle only the first three of those have a target
/// (cx, cy, radius) and the rest leave the gene unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationOp {
    Replace,
    X1,
    Y1,
    X2OrRadius,
    Y2,
    X3,
    Y3,
    Color,
    Alpha,
}

impl MutationOp {
    pub const ALL: [MutationOp; 9] = [
        MutationOp::Replace,
        MutationOp::X1,
        MutationOp::Y1,
        MutationOp::X2OrRadius,
        MutationOp::Y2,
        MutationOp::X3,
        MutationOp::Y3,
        MutationOp::Color,
        MutationOp::Alpha,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    pub fn apply<R: Rng + ?Sized>(self, gene: &mut Gene, rng: &mut R, canvas: Canvas) {
        match self {
            MutationOp::Replace => {
                *gene = random_gene(rng, canvas);
                return;
            }
            MutationOp::Color => {
                let [r, g, b]: [u8; 3] = rng.random();
                gene.rgba = [r, g, b, gene.rgba[3]];
                return;
            }
            MutationOp::Alpha => {
                gene.rgba[3] = rng.random();
                return;
            }
            _ => {}
        }

        match (self, &mut gene.shape) {
            (MutationOp::X1, Shape::Circle { cx, .. }) => *cx = rand_x(rng, canvas),
            (MutationOp::X1, Shape::Triangle { x1, .. }) => *x1 = rand_x(rng, canvas),
            (MutationOp::Y1, Shape::Circle { cy, .. }) => *cy = rand_y(rng, canvas),
            (MutationOp::Y1, Shape::Triangle { y1, .. }) => *y1 = rand_y(rng, canvas),
            (MutationOp::X2OrRadius, Shape::Circle { radius, .. }) => *radius = rand_radius(rng),
            (MutationOp::X2OrRadius, Shape::Triangle { x2, .. }) => *x2 = rand_x(rng, canvas),
            (MutationOp::Y2, Shape::Triangle { y2, .. }) => *y2 = rand_y(rng, canvas),
            (MutationOp::X3, Shape::Triangle { x3, .. }) => *x3 = rand_x(rng, canvas),
            (MutationOp::Y3, Shape::Triangle { y3, .. }) => *y3 = rand_y(rng, canvas),
            // triangle-only coordinates on a circle
            _ => {}
        }
    }
}

/// one uniformly chosen point mutation; returns which one ran
pub fn mutate_gene<R: Rng + ?Sized>(gene: &mut Gene, rng: &mut R, canvas: Canvas) -> MutationOp {
    let op = MutationOp::random(rng);
    op.apply(gene, rng, canvas);
    op
}

/// single midpoint cut: child gets the first ⌊n/2⌋ genes of `a`, the rest from `b`.
/// all three must have the same gene count; otherwise the child is left
/// untouched and false is returned.
pub fn crossover(a: &Chromosome, b: &Chromosome, child: &mut Chromosome) -> bool {
    let n = child.len();
    if a.len() != n || b.len() != n {
        return false;
    }
    let mid = n / 2;
    child.shapes[..mid].copy_from_slice(&a.shapes[..mid]);
    child.shapes[mid..].copy_from_slice(&b.shapes[mid..]);
    true
}

/// binary tournament inside `island`: two uniform draws with replacement,
/// strictly lower fitness wins, ties keep the first draw
pub fn tournament<R: Rng + ?Sized>(pop: &[Chromosome], island: IslandRange, rng: &mut R) -> usize {
    let first = rng.random_range(island.indices());
    let second = rng.random_range(island.indices());
    if pop[second].fitness < pop[first].fitness {
        second
    } else {
        first
    }
}

/// index of the lowest fitness in `island`, earliest wins ties
pub fn find_best(pop: &[Chromosome], island: IslandRange) -> usize {
    let mut best = island.start;
    for i in island.indices() {
        if pop[i].fitness < pop[best].fitness {
            best = i;
        }
    }
    best
}

/// index of the highest fitness in `island`, earliest wins ties
pub fn find_worst_index(pop: &[Chromosome], island: IslandRange) -> usize {
    let mut worst = island.start;
    for i in island.indices() {
        if pop[i].fitness > pop[worst].fitness {
            worst = i;
        }
    }
    worst
}

/// island members ordered from best to worst, earliest first among equals
fn ranked(pop: &[Chromosome], island: IslandRange) -> Vec<usize> {
    let mut order: Vec<usize> = island.indices().collect();
    order.sort_by(|&a, &b| pop[a].fitness.partial_cmp(&pop[b].fitness).unwrap_or(Ordering::Equal));
    order
}

/// island members ordered from worst to best, earliest first among equals
fn ranked_worst_first(pop: &[Chromosome], island: IslandRange) -> Vec<usize> {
    let mut order: Vec<usize> = island.indices().collect();
    order.sort_by(|&a, &b| pop[b].fitness.partial_cmp(&pop[a].fitness).unwrap_or(Ordering::Equal));
    order
}

/// ring migration: the `MIGRANTS_PER_ISLAND` best of island d-1 (mod K)
/// overwrite the same number of worst members of island d, genome and cached
/// fitness. all migrants are captured before any slot is written, so an
/// island's emigrants are unaffected by its own intake.
pub fn migrate(pop: &mut [Chromosome], islands: &[IslandRange]) {
    profiling::scope!("migrate");
    let k = islands.len();
    if k == 0 {
        return;
    }
    let migrants: Vec<Vec<Chromosome>> = islands
        .iter()
        .map(|&r| ranked(pop, r).into_iter().take(MIGRANTS_PER_ISLAND).map(|i| pop[i].clone()).collect())
        .collect();

    for (d, &island) in islands.iter().enumerate() {
        let incoming = &migrants[(d + k - 1) % k];
        let slots = ranked_worst_first(pop, island);
        for (&slot, migrant) in slots.iter().zip(incoming) {
            pop[slot].assign_from(migrant);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    const CANVAS: Canvas = Canvas::new(640, 480);

    fn scored(fitness: &[f64]) -> Vec<Chromosome> {
        fitness
            .iter()
            .enumerate()
            .map(|(i, &f)| {
                let mut c = Chromosome::from_genes(vec![Gene {
                    shape: Shape::Circle { cx: i as i32, cy: 0, radius: 1 },
                    rgba: [0; 4],
                }]);
                c.fitness = f;
                c
            })
            .collect()
    }

    fn in_canvas(shape: &Shape) -> bool {
        let x_ok = |x: i32| (0..640).contains(&x);
        let y_ok = |y: i32| (0..480).contains(&y);
        match *shape {
            Shape::Circle { cx, cy, radius } => x_ok(cx) && y_ok(cy) && (1..=MAX_RADIUS).contains(&radius),
            Shape::Triangle { x1, y1, x2, y2, x3, y3 } => {
                x_ok(x1) && x_ok(x2) && x_ok(x3) && y_ok(y1) && y_ok(y2) && y_ok(y3)
            }
        }
    }

    #[test]
    fn test_random_genes_stay_in_range_and_mix_kinds() {
        let mut rng = Pcg32::seed_from_u64(1);
        let genes: Vec<Gene> = (0..2000).map(|_| random_gene(&mut rng, CANVAS)).collect();
        assert!(genes.iter().all(|g| in_canvas(&g.shape)));
        let circles = genes.iter().filter(|g| g.shape.is_circle()).count();
        assert!((800..1200).contains(&circles), "circles = {circles}");
    }

    #[test]
    fn test_random_init_resets_fitness() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut c = Chromosome::zeroed(10);
        c.fitness = 5.0;
        random_init(&mut c, &mut rng, CANVAS);
        assert!(!c.is_evaluated());
        assert_eq!(c.len(), 10);
    }

    #[test]
    fn test_mutations_keep_genes_in_range() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut gene = random_gene(&mut rng, CANVAS);
        for _ in 0..5000 {
            mutate_gene(&mut gene, &mut rng, CANVAS);
            assert!(in_canvas(&gene.shape), "{gene:?}");
        }
    }

    #[test]
    fn test_triangle_only_ops_leave_circles_alone() {
        let mut rng = Pcg32::seed_from_u64(4);
        let circle = Gene { shape: Shape::Circle { cx: 5, cy: 6, radius: 7 }, rgba: [1, 2, 3, 4] };
        for op in [MutationOp::Y2, MutationOp::X3, MutationOp::Y3] {
            let mut g = circle;
            op.apply(&mut g, &mut rng, CANVAS);
            assert_eq!(g, circle, "{op:?}");
        }
    }

    #[test]
    fn test_color_and_alpha_ops_touch_only_their_channels() {
        let mut rng = Pcg32::seed_from_u64(5);
        let base = Gene { shape: Shape::Circle { cx: 5, cy: 6, radius: 7 }, rgba: [1, 2, 3, 4] };

        let mut g = base;
        MutationOp::Color.apply(&mut g, &mut rng, CANVAS);
        assert_eq!(g.shape, base.shape);
        assert_eq!(g.rgba[3], 4);

        let mut g = base;
        MutationOp::Alpha.apply(&mut g, &mut rng, CANVAS);
        assert_eq!(g.shape, base.shape);
        assert_eq!(&g.rgba[..3], &[1, 2, 3]);
    }

    #[test]
    fn test_radius_op_on_circle() {
        let mut rng = Pcg32::seed_from_u64(6);
        let mut g = Gene { shape: Shape::Circle { cx: 5, cy: 6, radius: 0 }, rgba: [0; 4] };
        MutationOp::X2OrRadius.apply(&mut g, &mut rng, CANVAS);
        match g.shape {
            Shape::Circle { cx, cy, radius } => {
                assert_eq!((cx, cy), (5, 6));
                assert!((1..=MAX_RADIUS).contains(&radius));
            }
            other => panic!("shape kind changed: {other:?}"),
        }
    }

    #[test]
    fn test_every_op_is_drawn() {
        let mut rng = Pcg32::seed_from_u64(7);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(MutationOp::random(&mut rng));
        }
        assert_eq!(seen.len(), 9);
    }

    fn line(offset: i32, n: usize) -> Chromosome {
        Chromosome::from_genes(
            (0..n)
                .map(|i| Gene { shape: Shape::Circle { cx: offset + i as i32, cy: 0, radius: 1 }, rgba: [0; 4] })
                .collect(),
        )
    }

    #[test]
    fn test_crossover_midpoint() {
        let pa = line(100, 5);
        let pb = line(200, 5);
        let mut child = Chromosome::zeroed(5);
        assert!(crossover(&pa, &pb, &mut child));
        assert_eq!(&child.shapes[..2], &pa.shapes[..2]);
        assert_eq!(&child.shapes[2..], &pb.shapes[2..]);
    }

    #[test]
    fn test_crossover_single_gene_comes_from_b() {
        let pa = scored(&[0.0]).remove(0);
        let mut pb = pa.clone();
        pb.shapes[0].rgba = [9; 4];
        let mut child = Chromosome::zeroed(1);
        assert!(crossover(&pa, &pb, &mut child));
        assert_eq!(child.shapes, pb.shapes);
    }

    #[test]
    fn test_crossover_rejects_mismatched_lengths() {
        let pa = Chromosome::zeroed(3);
        let pb = Chromosome::zeroed(4);
        let mut child = Chromosome::zeroed(3);
        assert!(!crossover(&pa, &pb, &mut child));
    }

    #[test]
    fn test_best_and_worst_break_ties_early() {
        let pop = scored(&[5.0, 1.0, 9.0, 1.0, 9.0]);
        let all = IslandRange::whole(5);
        assert_eq!(find_best(&pop, all), 1);
        assert_eq!(find_worst_index(&pop, all), 2);
        assert_eq!(find_best(&pop, IslandRange { start: 2, end: 4 }), 3);
    }

    #[test]
    fn test_tournament_stays_in_island_and_prefers_better() {
        let pop = scored(&[0.0, 0.0, 3.0, 1.0, 2.0, 0.0]);
        let island = IslandRange { start: 2, end: 4 };
        let mut rng = Pcg32::seed_from_u64(8);
        let mut wins = [0usize; 6];
        for _ in 0..3000 {
            let w = tournament(&pop, island, &mut rng);
            assert!(island.contains(w));
            wins[w] += 1;
        }
        // P(win) = 1/9, 5/9, 3/9 for fitness 3, 1, 2
        assert!(wins[3] > wins[4] && wins[4] > wins[2], "{wins:?}");
    }

    #[test]
    fn test_single_member_tournament() {
        let pop = scored(&[1.0, 2.0]);
        let mut rng = Pcg32::seed_from_u64(9);
        assert_eq!(tournament(&pop, IslandRange { start: 1, end: 1 }, &mut rng), 1);
    }

    #[test]
    fn test_ring_migration() {
        // islands [0..2] [3..5] [6..8], bests at 1, 3, 8; worsts at 0, 5, 6
        let mut pop = scored(&[9.0, 1.0, 5.0, 2.0, 6.0, 7.0, 8.0, 4.0, 3.0]);
        let islands = crate::island::partition(9, 3);
        let before = pop.clone();
        migrate(&mut pop, &islands);

        assert_eq!(pop[0], before[8], "island 0 receives island 2's best");
        assert_eq!(pop[5], before[1], "island 1 receives island 0's best");
        assert_eq!(pop[6], before[3], "island 2 receives island 1's best");
        for i in [1, 2, 3, 4, 7, 8] {
            assert_eq!(pop[i], before[i]);
        }
    }

    #[test]
    fn test_each_island_takes_exactly_its_quota() {
        let mut pop = scored(&[3.0, 8.0, 1.0, 7.0, 2.0, 9.0, 4.0, 6.0]);
        let islands = crate::island::partition(8, 2);
        let before = pop.clone();
        migrate(&mut pop, &islands);

        for island in &islands {
            let changed = island.indices().filter(|&i| pop[i] != before[i]).count();
            assert_eq!(changed, MIGRANTS_PER_ISLAND);
        }
        // island 0 [3, 8, 1, 7] loses its worst to island 1's best
        assert_eq!(pop[1], before[4]);
        // island 1 [2, 9, 4, 6] loses its worst to island 0's best
        assert_eq!(pop[5], before[2]);
    }

    #[test]
    fn test_single_island_migration_copies_own_best() {
        let mut pop = scored(&[4.0, 1.0, 9.0]);
        let islands = crate::island::partition(3, 1);
        let best = pop[1].clone();
        migrate(&mut pop, &islands);
        assert_eq!(pop[2], best);
    }
}
