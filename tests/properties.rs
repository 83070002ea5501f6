use microscript::{MemoryData, RuntimeError, Value, Vm, compile};
use proptest::prelude::*;

fn program_of_pushes(values: &[i32]) -> String {
    let mut text = String::new();
    for v in values {
        text.push_str(&format!("push #{}\n", v));
    }
    for _ in 1..values.len() {
        text.push_str("add\n");
    }
    text
}

proptest! {
    #[test]
    fn sum_of_pushes(values in prop::collection::vec(-1000i32..1000, 1..40)) {
        let stream = compile(&program_of_pushes(&values)).unwrap();
        let expected: i32 = values.iter().sum();
        prop_assert_eq!(
            stream.evaluate(&mut MemoryData::new()),
            Ok(Some(Value::Number(expected as f64)))
        );
    }

    #[test]
    fn compiling_twice_is_identical(values in prop::collection::vec(-1000i32..1000, 1..20)) {
        let text = program_of_pushes(&values);
        let first = compile(&text).unwrap();
        let second = compile(&text).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            first.execute(&mut MemoryData::new()),
            second.execute(&mut MemoryData::new())
        );
    }

    /// A label resolves to the same instruction whether it is declared
    /// before or after the jump that names it.
    #[test]
    fn label_order_is_irrelevant(skipped in 0usize..10, value in -100i32..100) {
        let filler = "push #999\n".repeat(skipped);

        let forward = format!("jmp target\n{}target: push #{}", filler, value);
        let backward = format!(
            "jmp start\n{}target: push #{}\njmp end\nstart: jmp target\nend:",
            filler, value
        );

        let forward = compile(&forward).unwrap();
        let backward = compile(&backward).unwrap();

        prop_assert_eq!(
            forward.ops()[0].jump_target().and_then(|t| t.position),
            Some(skipped + 1)
        );
        prop_assert_eq!(
            forward.evaluate(&mut MemoryData::new()),
            backward.evaluate(&mut MemoryData::new())
        );
    }

    /// Registers written in one run are never visible to the next.
    #[test]
    fn runs_do_not_share_state(inputs in prop::collection::vec(any::<bool>(), 1..16)) {
        let stream = compile("push flag\nje unset\nmov $seen, #1\nunset: push $seen").unwrap();
        let vm = Vm::new();

        for flag in inputs {
            let mut data = MemoryData::new().with("flag", flag);
            let result = vm.run(&stream, &mut data);
            if flag {
                prop_assert_eq!(result.into_result(), Ok(Some(Value::Number(1.0))));
            } else {
                prop_assert_eq!(
                    result.error().map(|e| e.root()),
                    Some(&RuntimeError::UnsetRegister("seen".to_string()))
                );
            }
        }
    }
}
