//! End-to-end debug info construction for a small test program:
//!
//! ```c
//! struct foo
//! {
//!     int a;
//!     float b;
//!     int c[2];
//! };
//!
//! struct foo bar = { 1, 2.0, { 3, 4 } };
//! struct foo baz;
//!
//! inline static void copy( struct foo src     // function line here
//!                        , struct foo* pDst
//!                        )
//! { // function's scope line here
//!     *pDst = src;
//! }
//!
//! void DoCopy( )
//! {
//!     copy( bar, &baz );
//! }
//! ```
//!
//! The debug body of `struct foo` is deliberately filled in *after* the
//! function bodies, via an opaque forward declaration that is resolved at the
//! end; this is the two-phase pattern front ends use for recursive and
//! mutually-referential types.

use quillc_debuginfo::DebugInfoBuilder;
use quillc_ir::{
    GlobalVarData, InstKind, Module,
    debug::{
        DiExpression, DiFlags, InvalidNodeError, Location, MetadataNode, Qualifier,
        SourceLanguage, TypeEncoding,
    },
};
use quillc_ir_type::{ArrayType, FunctionType, PointerType, StructType, TargetLayout, Type};

#[test]
fn struct_copy_program_builds_a_resolved_graph() {
    let layout = TargetLayout::new();
    let mut module = Module::new("test");

    // IR-level types; the struct layout computed here is the authority the
    // debug coordinates below must agree with
    let i32x2 = Type::from(ArrayType::new(Type::I32, 2));
    let foo_ty = StructType::new([Type::I32, Type::F32, i32x2.clone()]);
    let foo = Type::from(foo_ty.clone());
    let foo_ptr = Type::from(PointerType::new(foo.clone()));
    let byte_ptr = Type::from(PointerType::new(Type::I8));

    // IR functions and globals
    let copy_fn =
        module.create_function("copy", FunctionType::new([foo_ptr.clone(), foo_ptr.clone()], []));
    let do_copy_fn = module.create_function("DoCopy", FunctionType::new([], []));
    let global_align = layout.abi_alignment_of(&foo) as u32;
    let bar = module.create_global(GlobalVarData::new("bar", foo.clone(), global_align));
    let baz = module.create_global(GlobalVarData::new("baz", foo.clone(), global_align));

    // Compile unit and file as the top-level scope for everything
    let mut di = DebugInfoBuilder::new();
    let cu = di
        .create_compile_unit(SourceLanguage::C99, "test.c", "/src", "quillc 0.3.0", false, "")
        .unwrap();
    let file = di.create_file("test.c", "/src").unwrap();

    // Basic types used in this compilation
    let di_int = di.create_basic_type("int", 32, TypeEncoding::Signed).unwrap();
    let di_float = di.create_basic_type("float", 32, TypeEncoding::Float).unwrap();
    let di_i32x2 = di
        .create_array_type(
            layout.bit_size_of(&i32x2) as u64,
            layout.abi_bit_alignment_of(&i32x2) as u32,
            di_int,
            2,
        )
        .unwrap();

    // struct foo starts out opaque; everything below references the
    // forward declaration
    let foo_fwd = di.create_replaceable_composite_type(cu, "foo", file, 1).unwrap();
    let di_const_foo = di.create_qualified_type(Qualifier::Const, foo_fwd).unwrap();
    let di_foo_ptr = di.create_pointer_type(foo_fwd, 64, 64).unwrap();

    let di_bar = di
        .create_global_variable(bar, cu, "bar", None, file, 8, foo_fwd, false, false)
        .unwrap();
    let _di_baz = di
        .create_global_variable(baz, cu, "baz", None, file, 9, foo_fwd, false, false)
        .unwrap();

    // The debug signature of copy() is (const foo, foo*), not the two
    // pointers of the IR signature: the first parameter is passed by value
    // using the pointer+alloca pattern
    let copy_di_sig = di.create_subroutine_type(file, None, &[di_const_foo, di_foo_ptr]).unwrap();
    let do_copy_di_sig = di.create_subroutine_type(file, None, &[]).unwrap();

    let copy_sp = di
        .create_function(
            copy_fn,
            file,
            "copy",
            None,
            file,
            11,
            copy_di_sig,
            true,
            true,
            Some(14),
            DiFlags::PROTOTYPED,
            false,
        )
        .unwrap();
    let do_copy_sp = di
        .create_function(
            do_copy_fn,
            file,
            "DoCopy",
            None,
            file,
            23,
            do_copy_di_sig,
            false,
            true,
            Some(24),
            DiFlags::empty(),
            false,
        )
        .unwrap();

    // copy() body
    let func = module.function_mut(copy_fn);
    let entry = func.create_block("entry");
    let param_src = di
        .create_argument(copy_sp, "src", file, 11, di_const_foo, false, DiFlags::empty(), 1)
        .unwrap();
    let param_dst = di
        .create_argument(copy_sp, "pDst", file, 12, di_foo_ptr, false, DiFlags::empty(), 2)
        .unwrap();

    // Locals carry no locations of their own; the debug info comes from the
    // declare pseudo-instructions below
    let dst_slot = func.append_inst(entry, InstKind::Alloca { ty: foo_ptr.clone() });
    let dst_addr = func.inst_result(dst_slot).unwrap();
    let p1 = func.param(1);
    func.append_inst(
        entry,
        InstKind::Store {
            addr: dst_addr,
            value: p1,
        },
    );

    let dst_declare = di
        .insert_declare(func, entry, dst_addr, param_dst, None, Location::new(file, 12, 38, copy_sp))
        .unwrap();
    // The IR passes src by pointer; a deref recovers the by-value semantics
    let p0 = func.param(0);
    let src_declare = di
        .insert_declare(
            func,
            entry,
            p0,
            param_src,
            Some(DiExpression::deref()),
            Location::new(file, 11, 43, copy_sp),
        )
        .unwrap();

    let loaded = func.append_inst(
        entry,
        InstKind::Load {
            addr: dst_addr,
            ty: foo_ptr.clone(),
        },
    );
    func.set_location(loaded, Location::new(file, 15, 6, copy_sp));
    let loaded_val = func.inst_result(loaded).unwrap();
    let dst_cast = func.append_inst(
        entry,
        InstKind::BitCast {
            value: loaded_val,
            ty: byte_ptr.clone(),
        },
    );
    func.set_location(dst_cast, Location::new(file, 15, 13, copy_sp));
    let src_cast = func.append_inst(
        entry,
        InstKind::BitCast {
            value: p0,
            ty: byte_ptr.clone(),
        },
    );
    func.set_location(src_cast, Location::new(file, 15, 13, copy_sp));
    let dst_raw = func.inst_result(dst_cast).unwrap();
    let src_raw = func.inst_result(src_cast).unwrap();
    let memcpy = func.append_inst(
        entry,
        InstKind::MemCpy {
            dst: dst_raw,
            src: src_raw,
            len: layout.byte_size_of(&foo) as u64,
            align: layout.abi_alignment_of(&foo) as u32,
        },
    );
    func.set_location(memcpy, Location::new(file, 15, 13, copy_sp));
    let ret = func.append_inst(entry, InstKind::Ret { value: None });
    func.set_location(ret, Location::new(file, 16, 1, copy_sp));

    // DoCopy() body
    let func = module.function_mut(do_copy_fn);
    let do_entry = func.create_block("entry");
    let tmp_slot = func.append_inst(do_entry, InstKind::Alloca { ty: foo.clone() });
    let tmp = func.inst_result(tmp_slot).unwrap();
    let tmp_cast = func.append_inst(
        do_entry,
        InstKind::BitCast {
            value: tmp,
            ty: byte_ptr.clone(),
        },
    );
    func.set_location(tmp_cast, Location::new(file, 25, 11, do_copy_sp));
    let call = func.append_inst(
        do_entry,
        InstKind::Call {
            callee: copy_fn,
            args: [tmp, tmp].into_iter().collect(),
            result_ty: None,
        },
    );
    func.set_location(call, Location::new(file, 25, 5, do_copy_sp));
    let do_ret = func.append_inst(do_entry, InstKind::Ret { value: None });
    func.set_location(do_ret, Location::new(file, 26, 1, do_copy_sp));

    // Fill in the debug body for struct foo, with coordinates taken from the
    // target layout, and resolve the forward declaration
    let members = [
        di.create_member_type(
            foo_fwd,
            "a",
            file,
            3,
            layout.bit_size_of(&Type::I32) as u64,
            layout.abi_bit_alignment_of(&Type::I32) as u32,
            layout.bit_offset_of_element(&foo_ty, 0) as u64,
            DiFlags::empty(),
            di_int,
        )
        .unwrap(),
        di.create_member_type(
            foo_fwd,
            "b",
            file,
            4,
            layout.bit_size_of(&Type::F32) as u64,
            layout.abi_bit_alignment_of(&Type::F32) as u32,
            layout.bit_offset_of_element(&foo_ty, 1) as u64,
            DiFlags::empty(),
            di_float,
        )
        .unwrap(),
        di.create_member_type(
            foo_fwd,
            "c",
            file,
            5,
            layout.bit_size_of(&i32x2) as u64,
            layout.abi_bit_alignment_of(&i32x2) as u32,
            layout.bit_offset_of_element(&foo_ty, 2) as u64,
            DiFlags::empty(),
            di_i32x2,
        )
        .unwrap(),
    ];
    let foo_complete = di
        .create_struct_type(
            cu,
            "foo",
            file,
            1,
            &layout,
            &foo_ty,
            layout.bit_size_of(&foo) as u64,
            layout.abi_bit_alignment_of(&foo) as u32,
            DiFlags::empty(),
            &members,
        )
        .unwrap();
    di.replace_all_uses(foo_fwd, foo_complete).unwrap();

    // All temporaries are resolved, so finalization succeeds and the graph
    // can be installed on the module
    di.finish().unwrap();
    module.attach_debug_info(di.into_graph());
    let graph = module.debug_info().unwrap();

    // The resolved struct has exactly the three members, in insertion order,
    // at the offsets the layout computed
    match graph.node(foo_complete) {
        MetadataNode::CompositeType(node) => {
            assert_eq!(node.bit_size, 128);
            assert_eq!(node.bit_align, 32);
            assert_eq!(node.members.as_slice(), members.as_slice());
            let coords: Vec<(&str, u64)> = node
                .members
                .iter()
                .map(|m| match graph.node(*m) {
                    MetadataNode::Member(member) => (member.name.as_str(), member.bit_offset),
                    node => panic!("unexpected member node: {}", node.kind_name()),
                })
                .collect();
            assert_eq!(coords, vec![("a", 0), ("b", 32), ("c", 64)]);
        }
        node => panic!("unexpected node: {}", node.kind_name()),
    }

    // Every reference to the forward declaration was rewritten, wherever it
    // lived: pointers, qualified wrappers, members' scopes, globals
    match graph.node(di_foo_ptr) {
        MetadataNode::PointerType(node) => assert_eq!(node.pointee, foo_complete),
        node => panic!("unexpected node: {}", node.kind_name()),
    }
    match graph.node(di_const_foo) {
        MetadataNode::QualifiedType(node) => assert_eq!(node.base, foo_complete),
        node => panic!("unexpected node: {}", node.kind_name()),
    }
    match graph.node(members[0]) {
        MetadataNode::Member(node) => assert_eq!(node.scope, foo_complete),
        node => panic!("unexpected node: {}", node.kind_name()),
    }
    match graph.node(di_bar) {
        MetadataNode::GlobalVariable(node) => {
            assert_eq!(node.ty, foo_complete);
            assert_eq!(node.global, bar);
        }
        node => panic!("unexpected node: {}", node.kind_name()),
    }

    // The forward declaration's own handle is dead
    assert_eq!(graph.try_node(foo_fwd), Err(InvalidNodeError::Replaced(foo_fwd)));

    // Scope chains terminate at the compile unit
    assert_eq!(graph.compile_unit_of(copy_sp), cu);
    assert_eq!(graph.compile_unit_of(do_copy_sp), cu);

    // Instruction locations survived on the copy() body, and the declare
    // pseudo-instructions sit in the entry block with theirs
    let func = module.function(copy_fn);
    assert_eq!(func.inst(loaded).location(), Some(Location::new(file, 15, 6, copy_sp)));
    assert_eq!(func.inst(dst_declare).location(), Some(Location::new(file, 12, 38, copy_sp)));
    match &func.inst(src_declare).kind {
        InstKind::DbgDeclare {
            storage,
            variable,
            expression,
        } => {
            assert_eq!(*storage, p0);
            assert_eq!(*variable, param_src);
            assert_eq!(expression.as_ref(), Some(&DiExpression::deref()));
        }
        kind => panic!("unexpected instruction: {kind:?}"),
    }
    assert!(func.block_insts(entry).contains(&dst_declare));
}
