use proptest::prelude::*;
use tensor_engine::{DenseTensor, SliceIndex, Tensor, layout};

fn shape() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=4, 1..=4)
}

fn slice_index() -> impl Strategy<Value = SliceIndex> {
    let bound = prop::option::of(-8isize..8);
    let step = prop_oneof![-3isize..=-1, 1isize..=3];
    (bound.clone(), bound, step).prop_map(|(start, stop, step)| SliceIndex::range_with_step(start, stop, step))
}

fn values(tensor: &impl Tensor<Elem = i64>) -> Vec<i64> {
    tensor.elements().copied().collect()
}

proptest! {
    #[test]
    fn prop_reshape_round_trip(dims in shape()) {
        let len = layout::product(&dims) as i64;
        let flat = DenseTensor::<i64>::arange(0, len, 1).unwrap();
        let shaped = flat.clone().reshape(&dims).unwrap();
        prop_assert_eq!(shaped.dims(), &dims[..]);
        prop_assert_eq!(shaped.reshape(&[len as usize]).unwrap(), flat);
    }

    #[test]
    fn prop_double_reversal_is_identity(dims in shape()) {
        let len = layout::product(&dims) as i64;
        let tensor = DenseTensor::<i64>::arange(0, len, 1).unwrap().reshape(&dims).unwrap();
        let reversed = tensor.slice_str("::-1").unwrap();
        let restored = reversed.slice_str("::-1").unwrap();
        prop_assert_eq!(values(&restored), values(&tensor));

        if dims[0] > 1 {
            prop_assert_ne!(values(&reversed), values(&tensor));
        }
    }

    #[test]
    fn prop_merged_slices_select_the_same_cells(
        len in 0usize..12,
        first in slice_index(),
        second in slice_index(),
    ) {
        let tensor = DenseTensor::<i64>::arange(0, len as i64, 1).unwrap();
        let outer = first.to_slice_def(len).unwrap();
        let inner = second.to_slice_def(outer.count).unwrap();
        let merged = outer.merge(&inner);

        let view = tensor.slice(&[first]).unwrap();
        let nested = view.slice(&[second]).unwrap();
        let expected: Vec<i64> = (0..merged.count).map(|i| merged.position(i) as i64).collect();
        prop_assert_eq!(values(&nested), expected);
    }

    #[test]
    fn prop_invert_walks_backwards(len in 1usize..12, index in slice_index()) {
        let def = index.to_slice_def(len).unwrap();
        let inverted = def.invert();
        let forward: Vec<usize> = (0..def.count).map(|i| def.position(i)).collect();
        let mut backward: Vec<usize> = (0..inverted.count).map(|i| inverted.position(i)).collect();
        backward.reverse();
        prop_assert_eq!(forward, backward);
    }
}
