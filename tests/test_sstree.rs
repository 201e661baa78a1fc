use rand::{rngs::StdRng, Rng, SeedableRng};
use sstree::{Config, Index, LinearIndex, Point, SearchMode, SsTree};

fn random_point(rng: &mut StdRng, dimension: usize) -> Vec<f64> {
    (0..dimension).map(|_| rng.gen_range(-100.0..100.0)).collect()
}

fn compare_with_linear(dimension: usize, n: usize, config: Config, seed: u64) {
    let mut tree = SsTree::new(dimension, config).expect("Invalid dimension");
    let mut linear = LinearIndex::new(dimension).expect("Invalid dimension");
    let mut rng = StdRng::seed_from_u64(seed);

    for i in 0..n {
        let point = Point::with_path(random_point(&mut rng, dimension), format!("p{i}"));
        Index::insert(&mut tree, point.clone()).expect("Valid point");
        linear.insert(point).expect("Valid point");
    }
    assert_eq!(tree.num_points(), linear.num_points());
    assert_eq!(tree.validate(), Ok(()));

    for _ in 0..20 {
        let query = random_point(&mut rng, dimension);
        let k = rng.gen_range(1..=20);

        let expected = linear.nearest(&query, k).expect("Valid query");
        let actual = tree.nearest(&query, k).expect("Valid query");
        assert_eq!(actual, expected, "k = {k}, n = {n}, dimension = {dimension}");

        let radius = rng.gen_range(0.0..60.0);
        let mut expected = linear.query_range(&query, radius).expect("Valid query");
        let mut actual = Index::query_range(&tree, &query, radius).expect("Valid query");
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
    }
}

#[test]
fn test_random() {
    let mut seed = 0;
    for dimension in [1, 2, 3, 8, 20, 50] {
        for n in [10, 100, 500, 2000] {
            compare_with_linear(dimension, n, Config::default(), seed);
            seed += 1;
        }
    }
}

#[test]
fn test_random_pruned() {
    let mut seed = 100;
    for dimension in [1, 2, 5, 16] {
        for n in [50, 1000] {
            let config = Config::default().with_search_mode(SearchMode::Pruned);
            compare_with_linear(dimension, n, config, seed);
            seed += 1;
        }
    }
}

#[test]
fn test_random_wide_nodes() {
    let config = Config::new(4, 12).expect("Invalid fanout");
    compare_with_linear(6, 1500, config, 200);
    let config = Config::new(3, 6).expect("Invalid fanout");
    compare_with_linear(3, 1500, config.with_search_mode(SearchMode::Pruned), 201);
}

#[test]
fn worst_first_order() {
    let mut tree = SsTree::new(2, Config::default()).expect("Invalid dimension");
    let mut rng = StdRng::seed_from_u64(300);
    for i in 0..300 {
        tree.insert_with_path(random_point(&mut rng, 2), i.to_string())
            .expect("Valid point");
    }

    let query = [0.0, 0.0];
    let worst_first = tree.query_neighbors(&query, 7).expect("Valid query");
    let mut best_first = tree.query_neighbors_sorted(&query, 7).expect("Valid query");
    best_first.reverse();
    assert_eq!(worst_first, best_first);

    let with_distances = tree
        .query_neighbors_with_distances(&query, 7)
        .expect("Valid query");
    assert!(with_distances.windows(2).all(|pair| pair[0].1 <= pair[1].1));
}
